use std::path::Path;

use crate::params::Algorithm;

const BASIC_VERTEX: &str = include_str!("basic.vert.wgsl");
const BAYER_FRAGMENT: &str = include_str!("bayer-dither.wgsl");
const RANDOM_FRAGMENT: &str = include_str!("random-dither.wgsl");
const BLUE_NOISE_FRAGMENT: &str = include_str!("blue-noise-dither.wgsl");
const HALFTONE_FRAGMENT: &str = include_str!("halftone-dither.wgsl");

/// Source for the window blit pass (not part of the dithering registry)
pub const PRESENT_SHADER: &str = include_str!("present.wgsl");

pub const VERTEX_FILE_NAME: &str = "basic.vert.wgsl";

/// One vertex shader plus one fragment shader per [`Algorithm`]
///
/// Fragments are indexed by [`Algorithm::index`], so every variant always
/// resolves to a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderRegistry {
    vertex: String,
    fragments: [String; 4],
}

impl ShaderRegistry {
    /// Registry backed by the WGSL sources compiled into the crate
    pub fn builtin() -> Self {
        Self {
            vertex: BASIC_VERTEX.to_string(),
            fragments: [
                BAYER_FRAGMENT.to_string(),
                RANDOM_FRAGMENT.to_string(),
                BLUE_NOISE_FRAGMENT.to_string(),
                HALFTONE_FRAGMENT.to_string(),
            ],
        }
    }

    /// Registry from caller-supplied sources, in [`Algorithm::ALL`] order
    pub fn new(vertex: impl Into<String>, fragments: [String; 4]) -> Self {
        Self {
            vertex: vertex.into(),
            fragments,
        }
    }

    /// Load `basic.vert.wgsl` and `<algorithm>-dither.wgsl` from `dir`
    ///
    /// Files missing from the directory fall back to the built-in source.
    pub fn load_dir(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("shader directory {} does not exist", dir.display()),
            ));
        }

        let mut registry = Self::builtin();
        let vertex_path = dir.join(VERTEX_FILE_NAME);
        if vertex_path.is_file() {
            registry.vertex = std::fs::read_to_string(&vertex_path)?;
            log::debug!("Loaded vertex shader from {}", vertex_path.display());
        }

        for algorithm in Algorithm::ALL {
            let path = dir.join(Self::fragment_file_name(algorithm));
            if path.is_file() {
                registry.fragments[algorithm.index()] = std::fs::read_to_string(&path)?;
                log::debug!("Loaded {} fragment shader from {}", algorithm, path.display());
            }
        }

        Ok(registry)
    }

    pub fn fragment_file_name(algorithm: Algorithm) -> String {
        format!("{}-dither.wgsl", algorithm.key())
    }

    pub fn vertex(&self) -> &str {
        &self.vertex
    }

    /// Fragment source for `algorithm`
    pub fn resolve(&self, algorithm: Algorithm) -> &str {
        &self.fragments[algorithm.index()]
    }

    /// Fragment source for a free-form key; unknown keys fall back to Bayer
    pub fn resolve_key(&self, key: &str) -> &str {
        let algorithm = key.parse::<Algorithm>().unwrap_or_else(|_| {
            log::warn!("Unknown algorithm '{}', using bayer", key);
            Algorithm::Bayer
        });
        self.resolve(algorithm)
    }
}

impl Default for ShaderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_sources_have_entry_points() {
        let registry = ShaderRegistry::builtin();
        assert!(registry.vertex().contains("fn vs_main"));
        for algorithm in Algorithm::ALL {
            let source = registry.resolve(algorithm);
            assert!(source.contains("fn fs_main"), "{} lacks fs_main", algorithm);
            assert!(source.contains("@binding(2) var<uniform> params"));
        }
    }

    #[test]
    fn test_each_algorithm_has_distinct_source() {
        let registry = ShaderRegistry::builtin();
        assert_ne!(
            registry.resolve(Algorithm::Bayer),
            registry.resolve(Algorithm::Halftone)
        );
        assert_ne!(
            registry.resolve(Algorithm::RandomNoise),
            registry.resolve(Algorithm::BlueNoise)
        );
    }

    #[test]
    fn test_unknown_key_falls_back_to_bayer() {
        let registry = ShaderRegistry::builtin();
        assert_eq!(
            registry.resolve_key("floyd-steinberg"),
            registry.resolve(Algorithm::Bayer)
        );
        assert_eq!(
            registry.resolve_key("blue-noise"),
            registry.resolve(Algorithm::BlueNoise)
        );
    }

    #[test]
    fn test_custom_sources() {
        let registry = ShaderRegistry::new(
            "vertex",
            ["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()],
        );
        assert_eq!(registry.vertex(), "vertex");
        assert_eq!(registry.resolve(Algorithm::BlueNoise), "c");
    }

    #[test]
    fn test_load_dir_overrides_present_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("halftone-dither.wgsl"), "// custom").unwrap();

        let registry = ShaderRegistry::load_dir(dir.path()).unwrap();
        assert_eq!(registry.resolve(Algorithm::Halftone), "// custom");
        assert_eq!(
            registry.resolve(Algorithm::Bayer),
            ShaderRegistry::builtin().resolve(Algorithm::Bayer)
        );
    }

    #[test]
    fn test_load_dir_missing_directory() {
        assert!(ShaderRegistry::load_dir("/definitely/not/a/shader/dir").is_err());
    }
}
