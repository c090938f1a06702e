//! CLI host for the stack-based bytecode VM.
//!
//! Usage: `vm-runner <image>`. Loads a flat binary image into memory,
//! boots the machine (reset phase, then frame phase), bridges the
//! memory-mapped output device to stdout, and reports core errors to
//! stderr (spec.md §6).

mod error;

use error::RunnerError;
use std::io::Write;
use std::path::{Path, PathBuf};
use vm_core::Cpu;

fn load_image(path: &Path) -> Result<Vec<u8>, RunnerError> {
    let data = std::fs::read(path).map_err(|source| RunnerError::MissingInput {
        path: path.to_path_buf(),
        source,
    })?;
    if data.len() > 65536 {
        return Err(RunnerError::ImageTooLarge {
            path: path.to_path_buf(),
            size: data.len(),
        });
    }
    Ok(data)
}

fn run(path: PathBuf) -> Result<(), RunnerError> {
    let data = load_image(&path)?;

    let mut cpu = Cpu::new();
    cpu.memory_mut().load(&data);

    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    let errors = cpu.boot(|byte| {
        // The device is a byte sink, not necessarily UTF-8 text.
        let _ = lock.write_all(&[byte]);
    });
    let _ = lock.flush();

    for e in &errors {
        eprintln!("Error: {e}");
    }
    if !errors.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn main() {
    let Some(path) = std::env::args_os().nth(1) else {
        eprintln!("usage: vm-runner <image>");
        std::process::exit(1);
    };

    if let Err(e) = run(PathBuf::from(path)) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
