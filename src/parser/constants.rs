use super::ast::Color;

/// Color given to brush classes that declare none
pub const DEFAULT_ENTITY_COLOR: Color = Color::new(0.6, 0.6, 0.6, 1.0);

/// Attribute name of the flags declared in a definition header
pub const SPAWNFLAGS: &str = "spawnflags";
