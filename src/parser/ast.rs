// Entity definition model produced by the parser

use crate::el::{EvaluationError, Expression, Value, VariableStore};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Source location information for error reporting (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// RGBA color with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color { r, g, b, a }
    }

    /// Build an opaque color from a definition-file triple.
    ///
    /// Each component above 1.0 is read as a byte value and divided by 255,
    /// so `(255 128 0)` and `(1 0.5 0)` describe (nearly) the same color.
    pub fn from_components(components: [f32; 3]) -> Self {
        let [r, g, b] = components.map(|c| if c > 1.0 { c / 255.0 } else { c });
        Color::new(r, g, b, 1.0)
    }
}

/// Error returned when a color string is not three numbers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color '{0}', expected three numbers such as \"0.6 0.6 0.6\"")]
pub struct ColorParseError(pub String);

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let components: Vec<f32> = s
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| ColorParseError(s.to_string()))?;

        match components[..] {
            [r, g, b] => Ok(Color::from_components([r, g, b])),
            _ => Err(ColorParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3 { x, y, z }
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.x, self.y, self.z)
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        BoundingBox { min, max }
    }

    /// Swap components so that `min <= max` on every axis.
    pub fn repair(self) -> Self {
        let (min, max) = (self.min, self.max);
        BoundingBox {
            min: Vec3::new(min.x.min(max.x), min.y.min(max.y), min.z.min(max.z)),
            max: Vec3::new(min.x.max(max.x), min.y.max(max.y), min.z.max(max.z)),
        }
    }
}

/// One bit of a flags attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagOption {
    pub value: u32,
    /// Empty for a reserved (unnamed) bit
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagsAttribute {
    pub name: String,
    pub options: Vec<FlagOption>,
}

impl FlagsAttribute {
    pub fn new(name: impl Into<String>) -> Self {
        FlagsAttribute {
            name: name.into(),
            options: Vec::new(),
        }
    }

    pub fn add_option(&mut self, value: u32, name: impl Into<String>) {
        self.options.push(FlagOption {
            value,
            name: name.into(),
        });
    }

    pub fn option(&self, value: u32) -> Option<&FlagOption> {
        self.options.iter().find(|option| option.value == value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    pub key: i64,
    pub description: String,
}

impl ChoiceOption {
    pub fn new(key: i64, description: impl Into<String>) -> Self {
        ChoiceOption {
            key,
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceAttribute {
    pub name: String,
    pub options: Vec<ChoiceOption>,
}

/// Attribute definitions an entity class can declare
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeDefinition {
    Flags(FlagsAttribute),
    Choice(ChoiceAttribute),
}

impl AttributeDefinition {
    pub fn name(&self) -> &str {
        match self {
            AttributeDefinition::Flags(flags) => &flags.name,
            AttributeDefinition::Choice(choice) => &choice.name,
        }
    }
}

/// Concrete model chosen for an entity instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSpecification {
    pub path: String,
    pub skin: u32,
    pub frame: u32,
}

/// Procedural model selector of a point entity
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefinition {
    expression: Expression,
}

impl ModelDefinition {
    pub fn new(expression: Expression) -> Self {
        ModelDefinition { expression }
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Evaluate the selector against an entity's attributes.
    ///
    /// The expression may yield a path string or a map with a `"path"` key and
    /// optional `"skin"` and `"frame"` numbers. Anything else selects no model.
    pub fn model_specification(
        &self,
        attributes: &dyn VariableStore,
    ) -> Result<Option<ModelSpecification>, EvaluationError> {
        let index = |value: Option<&Value>| {
            value
                .and_then(Value::as_number)
                .filter(|n| *n >= 0.0)
                .map_or(0, |n| n as u32)
        };

        let spec = match self.expression.evaluate(attributes)? {
            Value::String(path) if !path.is_empty() => Some(ModelSpecification {
                path,
                skin: 0,
                frame: 0,
            }),
            Value::Map(entries) => {
                let get = |key: &str| entries.iter().find(|(k, _)| k == key).map(|(_, v)| v);
                match get("path") {
                    Some(Value::String(path)) if !path.is_empty() => Some(ModelSpecification {
                        path: path.clone(),
                        skin: index(get("skin")),
                        frame: index(get("frame")),
                    }),
                    _ => None,
                }
            }
            _ => None,
        };
        Ok(spec)
    }
}

impl fmt::Display for ModelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.expression.fmt(f)
    }
}

impl Serialize for ModelDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.expression)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointEntityDefinition {
    pub name: String,
    pub color: Color,
    pub size: BoundingBox,
    pub description: String,
    pub attributes: Vec<AttributeDefinition>,
    pub model: Option<ModelDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrushEntityDefinition {
    pub name: String,
    pub color: Color,
    pub description: String,
    pub attributes: Vec<AttributeDefinition>,
}

/// A finished, emittable entity class
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityDefinition {
    Point(PointEntityDefinition),
    Brush(BrushEntityDefinition),
}

impl EntityDefinition {
    pub fn name(&self) -> &str {
        match self {
            EntityDefinition::Point(point) => &point.name,
            EntityDefinition::Brush(brush) => &brush.name,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            EntityDefinition::Point(point) => point.color,
            EntityDefinition::Brush(brush) => brush.color,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            EntityDefinition::Point(point) => &point.description,
            EntityDefinition::Brush(brush) => &brush.description,
        }
    }

    pub fn attributes(&self) -> &[AttributeDefinition] {
        match self {
            EntityDefinition::Point(point) => &point.attributes,
            EntityDefinition::Brush(brush) => &brush.attributes,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes().iter().find(|attribute| attribute.name() == name)
    }

    pub fn is_point(&self) -> bool {
        matches!(self, EntityDefinition::Point(_))
    }
}

/// Accumulator for one class definition while it is being parsed.
///
/// A class without a color is a base class: it is kept for inheritance and
/// never emitted.
#[derive(Debug, Clone, Default)]
pub(crate) struct ClassInfo {
    pub name: String,
    pub color: Option<Color>,
    pub size: Option<BoundingBox>,
    pub description: String,
    pub attributes: Vec<AttributeDefinition>,
    pub model: Option<ModelDefinition>,
    /// Named base classes, with where they were referenced
    pub superclasses: Vec<(String, SourceLocation)>,
}

impl ClassInfo {
    pub fn new(name: impl Into<String>) -> Self {
        ClassInfo {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_base(&self) -> bool {
        self.color.is_none()
    }

    /// Fill unset fields from `base` and prepend its attributes to `inherited`.
    pub fn inherit_from(&mut self, base: &ClassInfo, inherited: &mut Vec<AttributeDefinition>) {
        if self.color.is_none() {
            self.color = base.color;
        }
        if self.size.is_none() {
            self.size = base.size;
        }
        if self.model.is_none() {
            self.model = base.model.clone();
        }
        inherited.extend(base.attributes.iter().cloned());
    }

    /// Point if a size is known, brush otherwise.
    pub fn into_definition(self, default_color: Color) -> EntityDefinition {
        let color = self.color.unwrap_or(default_color);
        match self.size {
            Some(size) => EntityDefinition::Point(PointEntityDefinition {
                name: self.name,
                color,
                size,
                description: self.description,
                attributes: self.attributes,
                model: self.model,
            }),
            None => EntityDefinition::Brush(BrushEntityDefinition {
                name: self.name,
                color,
                description: self.description,
                attributes: self.attributes,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_normalization_is_per_component() {
        let color = Color::from_components([255.0, 0.5, 128.0]);
        assert_eq!(color.r, 1.0);
        assert_eq!(color.g, 0.5);
        assert!((color.b - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(color.a, 1.0);
    }

    #[test]
    fn test_color_from_str() {
        assert_eq!("0.6 0.6 0.6".parse::<Color>(), Ok(Color::new(0.6, 0.6, 0.6, 1.0)));
        assert!("0.6 0.6".parse::<Color>().is_err());
        assert!("red".parse::<Color>().is_err());
    }

    #[test]
    fn test_bounding_box_repair() {
        let bounds = BoundingBox::new(Vec3::new(16.0, -8.0, 0.0), Vec3::new(-16.0, 8.0, 32.0)).repair();
        assert_eq!(bounds.min, Vec3::new(-16.0, -8.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(16.0, 8.0, 32.0));
    }

    #[test]
    fn test_class_info_kind() {
        let mut info = ClassInfo::new("func_door");
        assert!(info.is_base());

        info.color = Some(Color::new(0.0, 0.5, 0.8, 1.0));
        let definition = info.clone().into_definition(Color::new(1.0, 1.0, 1.0, 1.0));
        assert!(!definition.is_point());

        info.size = Some(BoundingBox::new(Vec3::default(), Vec3::new(1.0, 1.0, 1.0)));
        assert!(info.into_definition(Color::new(1.0, 1.0, 1.0, 1.0)).is_point());
    }
}
