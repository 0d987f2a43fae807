//! Check system capabilities.

use rallymark_common::config::{config_file_path, AppConfig};
use rallymark_render_engine::ffmpeg::command_exists;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("RallyMark System Check");
    println!("{}", "=".repeat(50));

    let mut all_ok = true;
    for (binary, purpose) in [
        ("ffmpeg", "export and preview"),
        ("ffprobe", "media duration and source checks"),
    ] {
        if command_exists(binary) {
            println!("[OK] {binary} found ({purpose})");
        } else {
            println!("[MISSING] {binary} not in PATH ({purpose})");
            all_ok = false;
        }
    }

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[INFO] Config: defaults (no file at {})", config_path.display());
    }
    println!("     Projects dir: {}", config.projects_dir.display());
    println!(
        "     Export: {} @ {}fps, codec {}",
        config.export.output_name, config.export.fps, config.export.video_codec
    );

    println!();
    if all_ok {
        println!("All required tools are available. RallyMark is ready.");
    } else {
        println!("Some required tools are missing. Install ffmpeg to export highlights.");
    }

    Ok(())
}
