//! Memory budget expansion plugin for Fallout: New Vegas.
//!
//! The game caps its resource pools with byte budgets sized for the
//! hardware it shipped on. This plugin rewrites those budgets in the
//! running executable according to a configurable preset, then optionally
//! trims them back whenever the process falls behind its frame-time
//! target, and records what it did to a metrics file.
//!
//! Initialization is deferred to the post-post-load broadcast so every
//! other plugin has finished loading before game memory is touched.

mod budget;
mod config;
mod error;
mod frame;
mod logger;
mod patch;
mod telemetry;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use chrono::Local;
use log::{info, warn};
use nvse_rs::ffi::RUNTIME_VERSION_1_4_0_525;
use nvse_rs::prelude::*;

use crate::budget::{Budget, BudgetMb, ScalePolicy};
use crate::config::Config;
use crate::frame::FrameClock;
use crate::telemetry::Telemetry;

const CONFIG_PATH: &str = "Data/NVSE/Plugins/overdrive.toml";
const LOG_PATH: &str = "Data/NVSE/Plugins/overdrive.log";

static INITIALIZED: AtomicBool = AtomicBool::new(false);

struct Overdrive;

impl MessageListener for Overdrive {
    fn post_post_load(&self, _event: &MessageEvent) {
        initialize();
    }

    fn pre_load_game(&self, event: &MessageEvent) {
        match event.payload_str() {
            Some(path) => info!("loading save {path}"),
            None => info!("loading save"),
        }
    }

    fn save_game(&self, event: &MessageEvent) {
        match event.payload_str() {
            Some(path) => info!("saving {path}"),
            None => info!("saving"),
        }
    }

    fn runtime_script_error(&self, event: &MessageEvent) {
        if let Some(message) = event.payload_str() {
            warn!("script error: {message}");
        }
    }

    fn exit_to_main_menu(&self, _event: &MessageEvent) {
        info!("returned to main menu");
    }

    fn exit_game(&self, _event: &MessageEvent) {
        info!("session end");
    }
}

/// One-shot initialization, run from the first post-post-load broadcast.
///
/// Failures are logged and degrade the plugin rather than the game: a bad
/// configuration falls back to defaults, a failed patch pass leaves the
/// remaining sites untouched.
fn initialize() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    let (config, config_err) = match Config::load(Path::new(CONFIG_PATH)) {
        Ok(config) => (config, None),
        Err(err) => (Config::default(), Some(err)),
    };
    if logger::init(Path::new(LOG_PATH), config.log_level).is_err() {
        // No log file means no way to report anything else either.
        return;
    }
    info!("overdrive {} starting", env!("CARGO_PKG_VERSION"));
    if let Some(err) = config_err {
        warn!("falling back to default configuration: {err}");
    }
    if !config.enabled {
        info!("disabled by configuration");
        return;
    }

    let initial = config.preset.with_overrides(config.overrides);
    let mb = initial.to_mb();
    info!(
        "applying {} preset: exterior_texture={}MB interior_geometry={}MB \
         interior_texture={}MB interior_water={}MB actor_memory={}MB",
        config.preset.name(),
        mb.exterior_texture,
        mb.interior_geometry,
        mb.interior_texture,
        mb.interior_water,
        mb.actor_memory,
    );
    apply_budget(initial);

    if config.dynamic.enabled {
        spawn_monitor(config, mb);
    }
    info!("initialization complete");
}

#[cfg(windows)]
fn apply_budget(budget: Budget) -> bool {
    match patch::apply(&patch::plan(budget)) {
        Ok(()) => true,
        Err(err) => {
            log::error!("budget patching incomplete: {err}");
            false
        }
    }
}

#[cfg(not(windows))]
fn apply_budget(budget: Budget) -> bool {
    log::debug!("would write {} budget sites", patch::plan(budget).len());
    true
}

fn spawn_monitor(config: Config, initial: BudgetMb) {
    let policy = ScalePolicy {
        target_frame_ms: config.dynamic.target_frame_ms,
        scale_down: config.dynamic.scale_down,
        scale_up: config.dynamic.scale_up,
        floor: config.dynamic.floor,
        ceiling: config.dynamic.ceiling,
    };
    let spawned = thread::Builder::new()
        .name("overdrive-monitor".into())
        .spawn(move || monitor(&config, &policy, initial));
    if spawned.is_err() {
        warn!("could not start the budget monitor; keeping static budgets");
    }
}

/// Load monitor driving dynamic scaling and telemetry.
///
/// Each iteration sleeps for one target frame and measures how long the
/// sleep actually took. When the process is starved the wakeups slip, so
/// the smoothed oversleep tracks the frame-time growth the player sees;
/// at idle it settles on the target, inside the policy's dead band.
fn monitor(config: &Config, policy: &ScalePolicy, mut current: BudgetMb) {
    let mut clock = FrameClock::new(policy.target_frame_ms);
    let mut telemetry = if config.telemetry.enabled {
        match Telemetry::open(&config.telemetry.output) {
            Ok(telemetry) => Some(telemetry),
            Err(err) => {
                warn!("telemetry disabled: {err}");
                None
            }
        }
    } else {
        None
    };
    let quantum = Duration::from_secs_f64(policy.target_frame_ms.max(1.0) / 1000.0);
    let adjust_period = u64::from(config.dynamic.adjust_period.max(1));
    let telemetry_period = u64::from(config.telemetry.period.max(1));
    let mut sample: u64 = 0;
    clock.tick();
    loop {
        thread::sleep(quantum);
        let ema_ms = clock.tick();
        sample += 1;
        if sample % adjust_period == 0 {
            if let Some(next) = policy.adjust(current, ema_ms) {
                info!(
                    "scaling budgets at ema={ema_ms:.2}ms: interior_texture \
                     {}MB -> {}MB, exterior_texture {}MB -> {}MB",
                    current.interior_texture,
                    next.interior_texture,
                    current.exterior_texture,
                    next.exterior_texture,
                );
                if apply_budget(next.to_bytes()) {
                    current = next;
                }
            }
        }
        if sample % telemetry_period == 0 {
            if let Some(telemetry) = telemetry.as_mut() {
                if let Err(err) = telemetry.record(Local::now(), ema_ms, current) {
                    warn!("telemetry write failed: {err}");
                }
            }
        }
    }
}

/// Subscribes to the host's lifecycle messages, or runs `fallback` when
/// any part of the subscription is unavailable or refused.
///
/// Messaging is an optional feature of the host, never a reason to drop
/// the plugin: without it there is just no post-load ordering to wait
/// for, so the budgets go in right away.
fn attach(nvse: &Nvse, fallback: fn()) {
    let registered = nvse.messaging().and_then(|messaging| {
        messaging.register(nvse.plugin_handle()?, Some(c"NVSE"), Overdrive)
    });
    if registered.is_err() {
        fallback();
    }
}

fn load(nvse: &Nvse) -> Result<()> {
    attach(nvse, initialize);
    Ok(())
}

export_plugin! {
    builder: PluginBuilder::new(c"nvse-overdrive", 100)
        .required_runtime(RUNTIME_VERSION_1_4_0_525),
    load: load,
}

#[cfg(test)]
mod tests {
    use super::*;
    use nvse_rs::ffi;
    use std::ffi::{c_char, c_void};
    use std::ptr;
    use std::sync::atomic::AtomicU32;

    static FALLBACKS: AtomicU32 = AtomicU32::new(0);

    fn count_fallback() {
        FALLBACKS.fetch_add(1, Ordering::SeqCst);
    }

    unsafe extern "C" fn handle_three() -> ffi::PluginHandle {
        3
    }

    unsafe extern "C" fn refuse_listener(
        _handle: ffi::PluginHandle,
        _sender: *const c_char,
        _handler: *mut c_void,
    ) -> bool {
        false
    }

    unsafe extern "C" fn query_nothing(_id: u32) -> *mut c_void {
        ptr::null_mut()
    }

    unsafe extern "C" fn query_refusing_messaging(id: u32) -> *mut c_void {
        static MESSAGING: ffi::NVSEMessagingInterface = ffi::NVSEMessagingInterface {
            register_listener: Some(refuse_listener),
        };
        if id == ffi::INTERFACE_MESSAGING {
            ptr::addr_of!(MESSAGING).cast_mut().cast()
        } else {
            ptr::null_mut()
        }
    }

    fn host(query: unsafe extern "C" fn(u32) -> *mut c_void) -> ffi::NVSEInterface {
        ffi::NVSEInterface {
            nvse_version: ffi::NVSE_VERSION_INTEGER,
            runtime_version: ffi::RUNTIME_VERSION_1_4_0_525,
            is_editor: false,
            query_interface: Some(query),
            get_plugin_handle: Some(handle_three),
        }
    }

    // A host without messaging and a host that refuses the listener must
    // both end in direct initialization, never in a failed load.
    #[test]
    fn attach_falls_back_when_messaging_is_unavailable_or_refused() {
        let missing = host(query_nothing);
        attach(&Nvse::from_ref(&missing), count_fallback);
        assert_eq!(FALLBACKS.load(Ordering::SeqCst), 1);

        let refusing = host(query_refusing_messaging);
        attach(&Nvse::from_ref(&refusing), count_fallback);
        assert_eq!(FALLBACKS.load(Ordering::SeqCst), 2);
    }
}
