//! The default tech-line order: a fixed sequence of piece types each side
//! unlocks independently. Server config may randomize it at game setup.

use once_cell::sync::Lazy;
use serde::Deserialize;
use swarm_types::PieceName;

#[derive(Deserialize)]
struct TechLineFile {
    tech: Vec<PieceName>,
}

static DEFAULT_TECH_LINE: Lazy<Vec<PieceName>> = Lazy::new(|| {
    let file: TechLineFile =
        toml::from_str(include_str!("techline.toml")).expect("techline.toml is well-formed");
    file.tech
});

/// The catalog-default tech-line order (before any `randomizeTechLine` shuffle).
pub fn default_tech_line() -> &'static [PieceName] {
    &DEFAULT_TECH_LINE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tech_line_is_nonempty_and_matches_piece_catalog() {
        let line = default_tech_line();
        assert!(!line.is_empty());
        for name in line {
            assert!(
                crate::pieces::piece_stats(name).is_some(),
                "tech line entry {name} missing from piece catalog"
            );
        }
    }
}
