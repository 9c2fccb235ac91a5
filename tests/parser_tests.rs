// Integration tests for the definition parser

use entdef::parser::ast::{ChoiceOption, FlagOption};
use entdef::{
    AttributeDefinition, CollectingStatus, Color, DefParser, EntityDefinition, ParseError, SourceLocation,
    Vec3, DEFAULT_ENTITY_COLOR, SPAWNFLAGS,
};
use rstest::rstest;

const QUAKE_DEF: &str = include_str!("fixtures/quake.def");

fn parse(source: &str) -> (Result<Vec<EntityDefinition>, ParseError>, CollectingStatus) {
    let mut status = CollectingStatus::default();
    let result = DefParser::new(source, DEFAULT_ENTITY_COLOR).parse_definitions(&mut status);
    (result, status)
}

fn find<'d>(definitions: &'d [EntityDefinition], name: &str) -> &'d EntityDefinition {
    definitions
        .iter()
        .find(|definition| definition.name() == name)
        .unwrap_or_else(|| panic!("no definition named {name}"))
}

fn assert_color_eq(actual: Color, expected: (f32, f32, f32)) {
    let close = |a: f32, b: f32| (a - b).abs() < 1e-3;
    assert!(
        close(actual.r, expected.0) && close(actual.g, expected.1) && close(actual.b, expected.2),
        "expected {expected:?}, got {actual:?}"
    );
    assert_eq!(actual.a, 1.0);
}

#[test]
fn test_minimal_point_class() {
    let (result, status) = parse("/*QUAKED Name (1 0 0) (-1 -1 -1) (1 1 1)\nDesc*/");
    let definitions = result.expect("Parsing failed");

    assert_eq!(definitions.len(), 1);
    assert!(status.warnings.is_empty());
    let EntityDefinition::Point(point) = &definitions[0] else {
        panic!("Expected point entity");
    };
    assert_eq!(point.name, "Name");
    assert_eq!(point.color, Color::new(1.0, 0.0, 0.0, 1.0));
    assert_eq!(point.size.min, Vec3::new(-1.0, -1.0, -1.0));
    assert_eq!(point.size.max, Vec3::new(1.0, 1.0, 1.0));
    assert_eq!(point.description, "Desc");
    assert!(point.attributes.is_empty());
    assert!(point.model.is_none());
}

#[test]
fn test_base_class_is_only_used_for_inheritance() {
    let source = "/*QUAKED Base\n{ choice \"style\" ((0, \"a\")); }\n*/\n\
                  /*QUAKED child (0 1 0) ?\n{ base(\"Base\"); }\n*/";
    let definitions = parse(source).0.expect("Parsing failed");

    assert_eq!(definitions.len(), 1);
    assert_eq!(definitions[0].name(), "child");
    assert!(matches!(definitions[0].attribute("style"), Some(AttributeDefinition::Choice(_))));
}

#[rstest]
#[case("(255 128 0)", (1.0, 0.502, 0.0))]
#[case("(0.5 0.25 1.0)", (0.5, 0.25, 1.0))]
#[case("(1 1 1)", (1.0, 1.0, 1.0))]
#[case("(0 .5 .8)", (0.0, 0.5, 0.8))]
fn test_color_normalization(#[case] color: &str, #[case] expected: (f32, f32, f32)) {
    let definitions = parse(&format!("/*QUAKED c {color} ?\n*/")).0.expect("Parsing failed");
    assert_color_eq(definitions[0].color(), expected);
}

#[test]
fn test_spawnflag_values_and_reserved_bits() {
    let definitions = parse("/*QUAKED c (1 0 0) ? A - B\n*/").0.expect("Parsing failed");
    let Some(AttributeDefinition::Flags(flags)) = definitions[0].attribute(SPAWNFLAGS) else {
        panic!("Expected spawnflags");
    };
    assert_eq!(
        flags.options,
        [
            FlagOption { value: 1, name: "A".into() },
            FlagOption { value: 2, name: String::new() },
            FlagOption { value: 4, name: "B".into() },
        ]
    );
}

#[test]
fn test_inherited_attributes_come_first() {
    let source = "/*QUAKED B1\n{ choice \"one\" ((1, \"x\")); }\n*/\n\
                  /*QUAKED B2\n{ choice \"two\" ((2, \"y\")); }\n*/\n\
                  /*QUAKED E (1 1 1) ? FLAG\n{\n  base(\"B1\");\n  base(\"B2\");\n  choice \"own\" ((3, \"z\"));\n}\n*/";
    let definitions = parse(source).0.expect("Parsing failed");

    let names: Vec<_> = definitions[0].attributes().iter().map(AttributeDefinition::name).collect();
    assert_eq!(names, ["one", "two", SPAWNFLAGS, "own"]);
}

#[test]
fn test_local_values_win_over_inherited() {
    let source = "/*QUAKED Sized\n{ model(\"base.mdl\"); }\n*/\n\
                  /*QUAKED Other\n{ model(\"other.mdl\"); }\n*/\n\
                  /*QUAKED own (1 0 0) (0 0 0) (4 4 4)\n{ base(\"Sized\"); base(\"Other\"); }\n*/\n\
                  /*QUAKED local (1 0 0) (0 0 0) (4 4 4)\n{ base(\"Sized\"); model(\"local.mdl\"); }\n*/";
    let definitions = parse(source).0.expect("Parsing failed");

    let model = |name: &str| match find(&definitions, name) {
        EntityDefinition::Point(point) => point.model.as_ref().map(|model| model.to_string()),
        EntityDefinition::Brush(_) => panic!("Expected point entity"),
    };
    assert_eq!(model("own").as_deref(), Some("\"base.mdl\""));
    assert_eq!(model("local").as_deref(), Some("\"local.mdl\""));
}

#[test]
fn test_description_is_not_inherited() {
    let source = "/*QUAKED Base\nBase text.\n*/\n/*QUAKED child (1 0 0) ?\n{ base(\"Base\"); }\n*/";
    let definitions = parse(source).0.expect("Parsing failed");
    assert_eq!(definitions[0].description(), "");
}

#[test]
fn test_unknown_base_is_a_warning() {
    let (result, status) = parse("/*QUAKED c (1 0 0) ?\n{ base(\"Nowhere\"); }\n*/");
    assert_eq!(result.expect("Parsing failed").len(), 1);
    assert_eq!(status.warnings.len(), 1);
    assert_eq!(status.warnings[0].location, SourceLocation::new(2, 3));
}

#[rstest]
#[case::missing_newline("/*QUAKED a (1 0 0) ? */", 1, 22)]
#[case::newline_after_color("/*QUAKED a (1 0 0)\n*/", 1, 19)]
#[case::minus_after_color("/*QUAKED a (1 0 0) - X\n*/", 1, 20)]
#[case::unclosed_color("/*QUAKED a (1 0 0 ?\n*/", 1, 19)]
#[case::bad_choice_key("/*QUAKED a (1 0 0) ?\n{ choice \"c\" ((x, \"y\")); }\n*/", 2, 16)]
#[case::bracket("/*QUAKED a (1 0 0) ?\n{ [ }\n*/", 2, 3)]
#[case::unterminated_string("/*QUAKED a (1 0 0) ?\n{ base(\"oops); }\n*/", 2, 8)]
fn test_malformed_input_reports_position(#[case] source: &str, #[case] line: usize, #[case] column: usize) {
    let err = parse(source).0.unwrap_err();
    assert_eq!(err.location(), SourceLocation::new(line, column), "{err}");
}

#[rstest]
#[case("/*QUAKED a (1 0 0)\n*/", "newline")]
#[case("/*QUAKED a (1 0 0) - X\n*/", "'-'")]
#[case("/*QUAKED a (1 0 0) {\n*/", "'{'")]
fn test_color_must_be_followed_by_bounds_or_word(#[case] source: &str, #[case] found: &str) {
    match parse(source).0.unwrap_err() {
        ParseError::Syntax { expected, found: actual, .. } => {
            assert_eq!(expected, "'(' or word");
            assert_eq!(actual, found);
        }
        other => panic!("Expected syntax error, got {other:?}"),
    }
}

#[test]
fn test_error_discards_earlier_definitions() {
    let source = "/*QUAKED good (1 0 0) ?\n*/\n/*QUAKED bad (1 0 0\n*/";
    let (result, _) = parse(source);
    assert!(result.is_err());
}

#[test]
fn test_parsing_is_repeatable() {
    let (first, first_status) = parse(QUAKE_DEF);
    let (second, second_status) = parse(QUAKE_DEF);
    assert_eq!(first.expect("Parsing failed"), second.expect("Parsing failed"));
    assert_eq!(first_status.warnings, second_status.warnings);
}

#[test]
fn test_quake_fixture() {
    let (result, status) = parse(QUAKE_DEF);
    let definitions = result.expect("Parsing failed");

    let names: Vec<_> = definitions.iter().map(EntityDefinition::name).collect();
    assert_eq!(
        names,
        ["worldspawn", "item_armor1", "monster_army", "light", "func_door", "item_health"]
    );
    assert_eq!(status.warnings.len(), 1, "{:?}", status.warnings);
    assert_eq!(status.progress, 1.0);

    let worldspawn = find(&definitions, "worldspawn");
    assert!(!worldspawn.is_point());
    assert_eq!(
        worldspawn.description(),
        "Only used for the world entity.\nSet message to the level name."
    );

    let armor = find(&definitions, "item_armor1");
    let names: Vec<_> = armor.attributes().iter().map(AttributeDefinition::name).collect();
    assert_eq!(names, ["respawn", SPAWNFLAGS]);

    let EntityDefinition::Point(army) = find(&definitions, "monster_army") else {
        panic!("Expected point entity");
    };
    assert_eq!(army.model.as_ref().map(ToString::to_string).as_deref(), Some(r#"{ "path": "progs/soldier.mdl" }"#));
    assert_eq!(army.description, "Grunt.");

    let Some(AttributeDefinition::Choice(style)) = find(&definitions, "light").attribute("style") else {
        panic!("Expected choice attribute");
    };
    assert_eq!(style.options[2], ChoiceOption::new(10, "fluorescent"));

    let door = find(&definitions, "func_door");
    assert_color_eq(door.color(), (1.0, 0.502, 0.0));
    let Some(AttributeDefinition::Flags(flags)) = door.attribute(SPAWNFLAGS) else {
        panic!("Expected spawnflags");
    };
    assert_eq!(flags.options.len(), 6);
    assert_eq!(flags.option(32).map(|o| o.name.as_str()), Some("TOGGLE"));
}
