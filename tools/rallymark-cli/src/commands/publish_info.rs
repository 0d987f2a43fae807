//! Upload metadata for an exported file.

use std::path::PathBuf;

use rallymark_render_engine::UploadMetadata;

pub fn run(file: PathBuf) -> anyhow::Result<()> {
    let metadata = UploadMetadata::from_output_path(&file)?;
    if !file.exists() {
        tracing::warn!(path = %file.display(), "Export file does not exist yet");
    }

    println!("Title: {}", metadata.title);
    println!("Privacy: {}", metadata.privacy.as_str());
    println!("Category: {}", metadata.category_id);
    println!();
    println!("{}", serde_json::to_string_pretty(&metadata.to_request_body())?);
    Ok(())
}
