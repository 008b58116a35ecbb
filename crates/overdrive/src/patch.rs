//! In-memory patching of the game's budget constants.
//!
//! Two kinds of sites are rewritten. Code sites are the immediate
//! operands of the `push` instructions that seed each pool at
//! initialization, so cells loaded later pick up the new budgets. Data
//! sites are the live manager globals, so the running session picks them
//! up immediately. Addresses are module-relative and resolved against the
//! executable's load base at patch time.
//!
//! Only the 1.4.0.525 executable carries these offsets, which is why the
//! plugin pins that exact runtime build.

use crate::budget::Budget;

/// Code sites: immediate operands of the budget `push` instructions.
pub const CODE_EXTERIOR_TEXTURE: u32 = 0x00F3_DE43;
pub const CODE_INTERIOR_GEOMETRY: u32 = 0x00F3_E113;
pub const CODE_INTERIOR_TEXTURE: u32 = 0x00F3_E143;
pub const CODE_INTERIOR_WATER: u32 = 0x00F3_E173;
pub const CODE_ACTOR_MEMORY: u32 = 0x00F3_E593;

/// Data sites: live budget-manager globals.
pub const DATA_EXTERIOR_TEXTURE: u32 = 0x011C_5B5C;
pub const DATA_EXTERIOR_GEOMETRY: u32 = 0x011C_5BBC;
pub const DATA_EXTERIOR_WATER: u32 = 0x011C_5C50;
pub const DATA_INTERIOR_TEXTURE: u32 = 0x011C_5C60;
pub const DATA_INTERIOR_GEOMETRY: u32 = 0x011C_5C80;
pub const DATA_INTERIOR_WATER: u32 = 0x011C_5A4C;
pub const DATA_ACTOR_MEMORY: u32 = 0x011C_59E0;

/// Kind of memory a patch site lives in, which decides the page
/// protection used while writing and whether the instruction cache needs
/// flushing afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    Code,
    Data,
}

/// One 32-bit write at a module-relative address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Patch {
    pub rva: u32,
    pub value: u32,
    pub site: Site,
}

/// The full set of writes that puts `budget` into effect.
///
/// The exterior geometry and water managers have no initialization
/// constants of their own; they are seeded from the interior values, as
/// the game does.
#[must_use]
pub fn plan(budget: Budget) -> Vec<Patch> {
    let code = |rva, value| Patch {
        rva,
        value,
        site: Site::Code,
    };
    let data = |rva, value| Patch {
        rva,
        value,
        site: Site::Data,
    };
    vec![
        code(CODE_EXTERIOR_TEXTURE, budget.exterior_texture),
        code(CODE_INTERIOR_GEOMETRY, budget.interior_geometry),
        code(CODE_INTERIOR_TEXTURE, budget.interior_texture),
        code(CODE_INTERIOR_WATER, budget.interior_water),
        code(CODE_ACTOR_MEMORY, budget.actor_memory),
        data(DATA_EXTERIOR_TEXTURE, budget.exterior_texture),
        data(DATA_EXTERIOR_GEOMETRY, budget.interior_geometry),
        data(DATA_EXTERIOR_WATER, budget.interior_water),
        data(DATA_INTERIOR_TEXTURE, budget.interior_texture),
        data(DATA_INTERIOR_GEOMETRY, budget.interior_geometry),
        data(DATA_INTERIOR_WATER, budget.interior_water),
        data(DATA_ACTOR_MEMORY, budget.actor_memory),
    ]
}

#[cfg(windows)]
pub use windows_impl::apply;

#[cfg(windows)]
mod windows_impl {
    use std::ffi::c_void;

    use log::warn;
    use windows::Win32::System::Diagnostics::Debug::FlushInstructionCache;
    use windows::Win32::System::LibraryLoader::GetModuleHandleA;
    use windows::Win32::System::Memory::{
        VirtualProtect, PAGE_EXECUTE_READWRITE, PAGE_PROTECTION_FLAGS, PAGE_READWRITE,
    };
    use windows::Win32::System::Threading::GetCurrentProcess;

    use super::{Patch, Site};
    use crate::error::{Error, Result};

    /// Applies every patch in `patches` to the running executable.
    ///
    /// Failed sites are logged and counted rather than aborting the pass;
    /// a partially raised budget is strictly better than an unraised one.
    ///
    /// # Errors
    ///
    /// [`Error::Patch`] with the number of sites that could not be
    /// written.
    pub fn apply(patches: &[Patch]) -> Result<()> {
        let base = unsafe { GetModuleHandleA(None) }
            .map_err(|_| Error::Patch {
                count: patches.len(),
            })?
            .0 as usize;
        let mut failed = 0;
        for patch in patches {
            if !write_site(base, patch) {
                warn!("failed to patch site {:#010x}", patch.rva);
                failed += 1;
            }
        }
        if failed == 0 {
            Ok(())
        } else {
            Err(Error::Patch { count: failed })
        }
    }

    fn write_site(base: usize, patch: &Patch) -> bool {
        let addr = (base + patch.rva as usize) as *mut c_void;
        let writable = match patch.site {
            Site::Code => PAGE_EXECUTE_READWRITE,
            Site::Data => PAGE_READWRITE,
        };
        let size = std::mem::size_of::<u32>();
        let mut old = PAGE_PROTECTION_FLAGS(0);
        unsafe {
            if !VirtualProtect(addr, size, writable, &mut old).as_bool() {
                return false;
            }
            addr.cast::<u32>().write_volatile(patch.value);
            let mut restored = PAGE_PROTECTION_FLAGS(0);
            let _ = VirtualProtect(addr, size, old, &mut restored);
            if patch.site == Site::Code {
                let _ = FlushInstructionCache(GetCurrentProcess(), Some(addr.cast_const()), size);
            }
        }
        true
    }
}
