//! Subcommand implementations.

pub mod check;
pub mod export;
pub mod info;
pub mod init;
pub mod list;
pub mod mark;
pub mod plan;
pub mod preview;
pub mod publish_info;
pub mod score;
pub mod tag;
pub mod timeline;
pub mod unmark;

use std::path::Path;

use rallymark_project_model::marker::MarkerType;
use rallymark_project_model::project::LoadedMatch;

pub(crate) fn load_match(path: &Path) -> anyhow::Result<LoadedMatch> {
    LoadedMatch::load(path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))
}

/// Accept short aliases as well as the canonical labels.
pub(crate) fn parse_marker_type(input: &str) -> anyhow::Result<MarkerType> {
    let normalized = input.trim().to_ascii_lowercase();
    let parsed = match normalized.as_str() {
        "s" | "serve" => Some(MarkerType::Serve),
        "h" | "home" | "home-point" => Some(MarkerType::HomePoint),
        "a" | "away" | "away-point" => Some(MarkerType::AwayPoint),
        "n" | "none" | "no-point" => Some(MarkerType::NoPoint),
        _ => MarkerType::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(input.trim())),
    };
    parsed.ok_or_else(|| {
        anyhow::anyhow!("Unknown marker type: {input}. Use: serve, home, away, none")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_marker_type_aliases() {
        assert_eq!(parse_marker_type("serve").unwrap(), MarkerType::Serve);
        assert_eq!(parse_marker_type("H").unwrap(), MarkerType::HomePoint);
        assert_eq!(parse_marker_type("Away point").unwrap(), MarkerType::AwayPoint);
        assert_eq!(parse_marker_type("no point").unwrap(), MarkerType::NoPoint);
        assert!(parse_marker_type("ace").is_err());
    }
}
