//! Compute shader source assembly
//!
//! The WGSL body reads its sizes from constants that are prepended at pipeline
//! build time, so a new workgroup size or body count means a new module.

const LIFE_SHADER: &str = include_str!("shaders/life.wgsl");

/// Constants injected ahead of the compute shader body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderConstants {
    pub workgroup_size: u32,
    pub body_count: u32,
    pub type_count: u32,
}

impl ShaderConstants {
    pub fn preamble(&self) -> String {
        let mut preamble = String::new();
        preamble += &format!("const kWorkgroupSize = {};\n", self.workgroup_size);
        preamble += &format!("const kNumBodies = {};\n", self.body_count);
        preamble += &format!("const typeNum = {};\n", self.type_count);
        preamble
    }

    /// Full WGSL source: preamble followed by the shader body.
    pub fn compose(&self) -> String {
        self.preamble() + LIFE_SHADER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_text() {
        let constants = ShaderConstants {
            workgroup_size: 64,
            body_count: 4096,
            type_count: 8,
        };
        assert_eq!(
            constants.preamble(),
            "const kWorkgroupSize = 64;\nconst kNumBodies = 4096;\nconst typeNum = 8;\n"
        );
    }

    #[test]
    fn test_compose_prepends_constants() {
        let constants = ShaderConstants {
            workgroup_size: 128,
            body_count: 1000,
            type_count: 3,
        };
        let source = constants.compose();

        assert!(source.starts_with(&constants.preamble()));
        assert!(source.ends_with(LIFE_SHADER));
        assert!(source.contains("fn cs_main"));
        // The body must not redeclare the injected constants
        assert_eq!(source.matches("const kNumBodies").count(), 1);
        assert_eq!(source.matches("const kWorkgroupSize").count(), 1);
        assert_eq!(source.matches("const typeNum").count(), 1);
    }

    #[test]
    fn test_positions_wrap_into_half_open_cube() {
        assert!(LIFE_SHADER.contains("fn wrapUnit"));
        assert!(LIFE_SHADER.contains("select(f, vec3<f32>(0.0), f >= vec3<f32>(1.0))"));
        assert!(LIFE_SHADER.contains("let next = wrapUnit("));
        assert!(!LIFE_SHADER.contains("let next = fract("));
    }
}
