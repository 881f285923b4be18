use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::info;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use xkbcommon::xkb;

use clefd::charset::cache::CharSetCache;
use clefd::charset::registry::CharSetRegistry;
use clefd::config::keybindings::{self, CHORD_KEY_ACTIONS};
use clefd::config::{charset_file, MainSettings};
use clefd::controller::{self, InputController};
use clefd::input_source::InputSource;
use clefd::recognizer::ChordRecognizer;
use clefd::window::X11Platform;

#[derive(Parser, Debug)]
#[command(version, about = "A five-key chorded keyboard input daemon.", long_about = None)]
struct Args {
    /// Key-binding file. Defaults to `$XDG_CONFIG_HOME/clef/clefrc`.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Directory holding `main.json`, `alt.json`, `special.json`.
    #[arg(long)]
    charset_dir: Option<std::path::PathBuf>,

    /// Run built-in self-checks and exit.
    #[arg(long)]
    test: bool,

    /// Raise the log verbosity; repeatable.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn default_config_dir() -> Result<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("clef")).ok_or_else(|| anyhow!("could not determine user config directory"))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .is_test(cfg!(test))
        .try_init();
}

fn install_signal_handler(keep_running: Arc<AtomicBool>) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM]).context("failed to register signal handlers")?;
    std::thread::spawn(move || {
        for sig in signals.forever() {
            info!("received signal {sig:?}, shutting down");
            keep_running.store(false, Ordering::SeqCst);
        }
    });
    Ok(())
}

/// Runs the daemon's built-in self-check suite: the chord-algebra and
/// convenience-ordering invariants from the testable-properties list.
fn run_self_checks() -> Result<()> {
    use clefd::charset::values::CHORD_CONVENIENCE_ORDER;
    use clefd::chord::Chord;

    for bits in 0u8..=31 {
        let c = Chord::from_bits(bits);
        for i in 0..5u8 {
            if !c.uses_key(i) {
                assert_eq!(c.with_key_held(i).with_key_released(i), c, "chord algebra round-trip failed for {bits:#b}");
            }
        }
    }

    let singles: [u8; 5] = [0b00001, 0b00010, 0b00100, 0b01000, 0b10000];
    assert_eq!(&CHORD_CONVENIENCE_ORDER[..5], &singles[..], "convenience ordering must start with the five singletons");
    assert_eq!(*CHORD_CONVENIENCE_ORDER.last().unwrap(), 0b11111, "convenience ordering must end with all keys held");

    println!("self-checks passed");
    Ok(())
}

fn keysym_for(name: &str) -> Result<u32> {
    let keysym = xkb::keysym_from_name(name, xkb::KEYSYM_NO_FLAGS);
    if keysym == xkb::keysyms::KEY_NoSymbol {
        return Err(anyhow!("unrecognized key name {name:?}"));
    }
    Ok(keysym)
}

fn run(args: Args) -> Result<()> {
    init_logging(args.verbose);
    info!("clefd starting");

    let config_dir = match args.config.as_ref().and_then(|p| p.parent().map(|p| p.to_path_buf())) {
        Some(dir) => dir,
        None => default_config_dir()?,
    };
    let keybindings_path = args.config.unwrap_or_else(|| config_dir.join("clefrc"));
    let charset_dir = args.charset_dir.unwrap_or_else(|| config_dir.join("charsets"));
    let settings_path = config_dir.join("settings.json");

    let bindings = keybindings::load(&keybindings_path)
        .with_context(|| format!("failed to load key bindings from {keybindings_path:?}"))?;
    let _watcher = keybindings::start_watcher(keybindings_path.clone(), bindings.clone())
        .context("failed to start key-binding watcher")?;

    let chord_keysyms = {
        let guard = bindings.read().expect("key-binding lock poisoned");
        let mut resolved = [0u32; 5];
        for (i, action) in CHORD_KEY_ACTIONS.iter().enumerate() {
            let binding = guard
                .get(*action)
                .ok_or_else(|| anyhow!("key-binding file is missing required action {action:?}"))?;
            resolved[i] = keysym_for(&binding.key)?;
        }
        resolved
    };

    let main_entries = charset_file::load_charset(&charset_dir.join("main.json")).unwrap_or_default();
    let alt_entries = charset_file::load_charset(&charset_dir.join("alt.json")).unwrap_or_default();
    let special_entries = charset_file::load_charset(&charset_dir.join("special.json")).unwrap_or_default();
    let registry = CharSetRegistry::new(
        CharSetCache::build(main_entries).0,
        CharSetCache::build(alt_entries).0,
        CharSetCache::build(special_entries).0,
    );

    let mut settings = MainSettings::load(&settings_path)?;
    let cached_buffer = settings.take_cached_buffer();
    settings.save().context("failed to persist settings after consuming the cached buffer")?;

    let platform = X11Platform::connect().context("failed to connect to the X server")?;

    let keep_running = Arc::new(AtomicBool::new(true));
    install_signal_handler(keep_running.clone())?;

    let controller = Rc::new(RefCell::new(InputController::new(
        Box::new(platform),
        registry,
        bindings,
        settings.immediate_mode,
        keep_running.clone(),
    )));
    controller.borrow_mut().restore_cached_buffer(cached_buffer);

    let mut recognizer = ChordRecognizer::new();
    recognizer.add_listener(controller::attach(controller));

    let mut input_source = InputSource::new(chord_keysyms, keep_running)?;
    input_source.run(&mut recognizer)?;

    info!("clefd stopped");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.test {
        return run_self_checks();
    }
    run(args)
}
