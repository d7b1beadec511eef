use std::path::{Path, PathBuf};

/// Base token every intermediate artifact name starts with. Deliberately
/// unusual so the cleanup glob cannot collide with user data even when no
/// scratch directory is configured.
pub const TEMP_BASE: &str = "temp_huge_sort_coherence";

/// Suffix the sort stage appends to each tile it processes (via `-odix`).
pub const SORTED_SUFFIX: &str = "_s";

/// Intermediate tiles are always stored compressed.
pub const TILE_EXTENSION: &str = "laz";

/// Derives every intermediate filename and glob pattern for one pipeline
/// run from [`TEMP_BASE`] plus an optional scratch directory.
///
/// The tiler receives a single fixed output name and fans it out into
/// numbered tiles on its own; the glob handed to the sort stage must match
/// that fan-out, and the glob handed to the merge stage must match the
/// sort stage's suffix convention. Keeping all four derivations in one
/// value object is what makes that coupling testable.
#[derive(Debug, Clone)]
pub struct ArtifactNaming {
    temp_dir: Option<PathBuf>,
}

impl ArtifactNaming {
    pub fn new(temp_dir: Option<&Path>) -> Self {
        Self {
            temp_dir: temp_dir.map(Path::to_path_buf),
        }
    }

    /// Output name passed to the tile stage via `-o`. The scratch
    /// directory is not part of this name; it travels separately as the
    /// tiler's `-odir` option.
    pub fn tile_output_name(&self) -> String {
        format!("{TEMP_BASE}.{TILE_EXTENSION}")
    }

    /// Glob selecting every tile the tile stage produced. Sort-stage input
    /// and cleanup target; also matches the sorted tiles, which is what
    /// lets cleanup remove both generations at once.
    pub fn tile_glob(&self) -> String {
        self.in_temp_dir(format!("{TEMP_BASE}*.{TILE_EXTENSION}"))
    }

    /// Suffix handed to the sort stage via `-odix`.
    pub fn sorted_suffix(&self) -> &'static str {
        SORTED_SUFFIX
    }

    /// Glob selecting exactly the sorted tiles. Merge-stage input.
    pub fn sorted_glob(&self) -> String {
        self.in_temp_dir(format!("{TEMP_BASE}*{SORTED_SUFFIX}.{TILE_EXTENSION}"))
    }

    /// The name the sort stage gives a processed tile: suffix inserted
    /// before the extension. Mirrors the external tool's `-odix` behavior
    /// so tests can assert pattern/suffix agreement symbolically.
    pub fn sorted_name_for(tile_name: &str) -> String {
        match tile_name.rsplit_once('.') {
            Some((stem, ext)) => format!("{stem}{SORTED_SUFFIX}.{ext}"),
            None => format!("{tile_name}{SORTED_SUFFIX}"),
        }
    }

    fn in_temp_dir(&self, name: String) -> String {
        match &self.temp_dir {
            Some(dir) => dir.join(name).to_string_lossy().into_owned(),
            None => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glob::Pattern;

    fn fan_out_names() -> Vec<String> {
        // Shapes the external tiler is known to produce from the fixed
        // output name: the name itself plus coordinate-stamped variants.
        vec![
            format!("{TEMP_BASE}.{TILE_EXTENSION}"),
            format!("{TEMP_BASE}_273500_5642500.{TILE_EXTENSION}"),
            format!("{TEMP_BASE}_0_0.{TILE_EXTENSION}"),
        ]
    }

    #[test]
    fn tile_glob_matches_every_tile_fan_out_name() {
        let naming = ArtifactNaming::new(None);
        let pattern = Pattern::new(&naming.tile_glob()).unwrap();
        for name in fan_out_names() {
            assert!(pattern.matches(&name), "tile glob must match '{name}'");
        }
    }

    #[test]
    fn sorted_glob_matches_exactly_the_suffixed_tiles() {
        let naming = ArtifactNaming::new(None);
        let tile_pattern = Pattern::new(&naming.tile_glob()).unwrap();
        let sorted_pattern = Pattern::new(&naming.sorted_glob()).unwrap();
        for name in fan_out_names() {
            let sorted = ArtifactNaming::sorted_name_for(&name);
            assert!(
                sorted_pattern.matches(&sorted),
                "merge glob must match '{sorted}'"
            );
            assert!(
                !sorted_pattern.matches(&name),
                "merge glob must not match unsorted '{name}'"
            );
            // Cleanup uses the tile glob; it must cover both generations.
            assert!(tile_pattern.matches(&sorted));
        }
    }

    #[test]
    fn sorted_glob_is_tile_name_plus_suffix_plus_extension() {
        let naming = ArtifactNaming::new(None);
        assert_eq!(
            naming.sorted_glob(),
            format!("{TEMP_BASE}*{SORTED_SUFFIX}.{TILE_EXTENSION}")
        );
        assert_eq!(naming.sorted_suffix(), SORTED_SUFFIX);
    }

    #[test]
    fn temp_dir_prefixes_globs_but_not_the_tile_output_name() {
        let naming = ArtifactNaming::new(Some(Path::new("/scratch/run1")));
        assert_eq!(
            naming.tile_output_name(),
            format!("{TEMP_BASE}.{TILE_EXTENSION}")
        );
        assert!(naming.tile_glob().starts_with("/scratch/run1"));
        assert!(naming.sorted_glob().starts_with("/scratch/run1"));
    }

    #[test]
    fn sorted_name_for_inserts_suffix_before_extension() {
        assert_eq!(
            ArtifactNaming::sorted_name_for("temp_huge_sort_coherence_12_7.laz"),
            "temp_huge_sort_coherence_12_7_s.laz"
        );
    }
}
