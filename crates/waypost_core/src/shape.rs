//! # Primitive Shape Data
//!
//! Construction parameters of a primitive, the preset bodies a shape can be
//! built from, and named field overrides.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cross-section profile of a primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileCurve {
    /// Circle
    Circle,
    /// Square
    Square,
    /// Isosceles triangle
    IsoTriangle,
    /// Equilateral triangle
    EqualTriangle,
    /// Right triangle
    RightTriangle,
    /// Half circle
    HalfCircle,
}

impl ProfileCurve {
    const NAMES: &'static [(&'static str, Self)] = &[
        ("circle", Self::Circle),
        ("square", Self::Square),
        ("isotriangle", Self::IsoTriangle),
        ("equaltriangle", Self::EqualTriangle),
        ("righttriangle", Self::RightTriangle),
        ("halfcircle", Self::HalfCircle),
    ];
}

/// Extrusion path of a primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathCurve {
    /// Straight extrusion
    Line,
    /// Circular extrusion
    Circle,
    /// Alternate circular extrusion
    Circle2,
    /// Flexible path
    Flexible,
}

impl PathCurve {
    const NAMES: &'static [(&'static str, Self)] = &[
        ("line", Self::Line),
        ("circle", Self::Circle),
        ("circle2", Self::Circle2),
        ("flexible", Self::Flexible),
    ];
}

/// Failure applying a field override.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value {value:?} for shape field {field}")]
pub struct ShapeFieldError {
    /// Field name as given.
    pub field: String,
    /// Offending value.
    pub value: String,
}

/// Construction parameters of a primitive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ShapeData {
    pub profile_curve: ProfileCurve,
    pub path_curve: PathCurve,
    pub profile_begin: f32,
    pub profile_end: f32,
    pub profile_hollow: f32,
    pub path_begin: f32,
    pub path_end: f32,
    pub path_scale_x: f32,
    pub path_scale_y: f32,
    pub path_shear_x: f32,
    pub path_shear_y: f32,
    pub path_twist: f32,
    pub path_twist_begin: f32,
    pub path_radius_offset: f32,
    pub path_taper_x: f32,
    pub path_taper_y: f32,
    pub path_revolutions: f32,
    pub path_skew: f32,
}

impl Default for ShapeData {
    fn default() -> Self {
        Self::BOX
    }
}

impl ShapeData {
    /// Default cube.
    pub const BOX: Self = Self {
        profile_curve: ProfileCurve::Square,
        path_curve: PathCurve::Line,
        profile_begin: 0.0,
        profile_end: 1.0,
        profile_hollow: 0.0,
        path_begin: 0.0,
        path_end: 1.0,
        path_scale_x: 1.0,
        path_scale_y: 1.0,
        path_shear_x: 0.0,
        path_shear_y: 0.0,
        path_twist: 0.0,
        path_twist_begin: 0.0,
        path_radius_offset: 0.0,
        path_taper_x: 0.0,
        path_taper_y: 0.0,
        path_revolutions: 1.0,
        path_skew: 0.0,
    };

    const CYLINDER: Self = Self {
        profile_curve: ProfileCurve::Circle,
        ..Self::BOX
    };

    const PRISM: Self = Self {
        profile_curve: ProfileCurve::EqualTriangle,
        path_scale_x: 0.0,
        path_scale_y: 0.0,
        ..Self::BOX
    };

    const SPHERE: Self = Self {
        profile_curve: ProfileCurve::HalfCircle,
        path_curve: PathCurve::Circle,
        ..Self::BOX
    };

    const TORUS: Self = Self {
        profile_curve: ProfileCurve::Circle,
        path_curve: PathCurve::Circle,
        path_scale_y: 0.25,
        ..Self::BOX
    };

    const TUBE: Self = Self {
        profile_curve: ProfileCurve::Square,
        ..Self::TORUS
    };

    const RING: Self = Self {
        profile_curve: ProfileCurve::EqualTriangle,
        ..Self::TORUS
    };

    const PRESETS: &'static [(&'static str, Self)] = &[
        ("box", Self::BOX),
        ("cube", Self::BOX),
        ("cylinder", Self::CYLINDER),
        ("prism", Self::PRISM),
        ("sphere", Self::SPHERE),
        ("torus", Self::TORUS),
        ("tube", Self::TUBE),
        ("ring", Self::RING),
    ];

    /// Looks up a preset body by name (case-insensitive).
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::PRESETS
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, shape)| *shape)
    }

    /// Overrides one named field.
    ///
    /// Returns `Ok(false)` when the field name is not recognised; a
    /// recognised field with a malformed value is an error.
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<bool, ShapeFieldError> {
        let invalid = || ShapeFieldError {
            field: field.to_string(),
            value: value.to_string(),
        };
        let key = field.trim().to_ascii_lowercase();
        match key.as_str() {
            "profilecurve" => {
                self.profile_curve = lookup(ProfileCurve::NAMES, value).ok_or_else(invalid)?;
                return Ok(true);
            }
            "pathcurve" => {
                self.path_curve = lookup(PathCurve::NAMES, value).ok_or_else(invalid)?;
                return Ok(true);
            }
            _ => {}
        }

        let slot = match key.as_str() {
            "profilebegin" => &mut self.profile_begin,
            "profileend" => &mut self.profile_end,
            "profilehollow" => &mut self.profile_hollow,
            "pathbegin" => &mut self.path_begin,
            "pathend" => &mut self.path_end,
            "pathscalex" => &mut self.path_scale_x,
            "pathscaley" => &mut self.path_scale_y,
            "pathshearx" => &mut self.path_shear_x,
            "pathsheary" => &mut self.path_shear_y,
            "pathtwist" => &mut self.path_twist,
            "pathtwistbegin" => &mut self.path_twist_begin,
            "pathradiusoffset" => &mut self.path_radius_offset,
            "pathtaperx" => &mut self.path_taper_x,
            "pathtapery" => &mut self.path_taper_y,
            "pathrevolutions" => &mut self.path_revolutions,
            "pathskew" => &mut self.path_skew,
            _ => return Ok(false),
        };
        *slot = value.trim().parse().map_err(|_| invalid())?;
        Ok(true)
    }
}

fn lookup<T: Copy>(table: &[(&'static str, T)], name: &str) -> Option<T> {
    let name = name.trim();
    table
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|(_, value)| *value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let sphere = ShapeData::preset("Sphere").unwrap();
        assert_eq!(sphere.profile_curve, ProfileCurve::HalfCircle);
        assert_eq!(sphere.path_curve, PathCurve::Circle);
        assert_eq!(ShapeData::preset("CUBE"), Some(ShapeData::BOX));
        assert!(ShapeData::preset("dodecahedron").is_none());
    }

    #[test]
    fn test_field_overrides() {
        let mut shape = ShapeData::BOX;
        assert_eq!(shape.set_field("ProfileHollow", "0.5"), Ok(true));
        assert_eq!(shape.set_field("pathcurve", "circle"), Ok(true));
        assert_eq!(shape.set_field("sparkle", "1"), Ok(false));
        assert!(shape.set_field("pathtwist", "lots").is_err());
        assert!(shape.set_field("profilecurve", "hexagon").is_err());

        assert!((shape.profile_hollow - 0.5).abs() < f32::EPSILON);
        assert_eq!(shape.path_curve, PathCurve::Circle);
    }
}
