//! Class definition parsing
//!
//! One definition lives inside a C-style comment:
//!
//! ```text
//! definition ::= "/*" name header NEWLINE attributes? description "*/"
//! header     ::= ("(" color ")" (bounds | "?" | word) spawnflag*)?
//! bounds     ::= "(" vector ")" "(" vector ")"
//! spawnflag  ::= word | "-"
//! attributes ::= "{" (attribute ";")* "}"
//! attribute  ::= "default" "(" string "," string ")"
//!              | "base" "(" string ")"
//!              | "choice" string "(" ("(" integer "," string ")")* ")"
//!              | "model" "(" model-expression ")"
//! ```
//!
//! Anything outside a definition comment is skipped. A definition without a
//! color is a base class: it is remembered for `base("...")` references and
//! never emitted.

use crate::diagnostics::ParserStatus;
use crate::parser::ast::*;
use crate::parser::constants::SPAWNFLAGS;
use crate::parser::lexer::{Token, TokenKind};
use crate::parser::parse::{expect, DefParser, ParseError, Parsed};
use tracing::debug;

impl<'a> DefParser<'a> {
    /// Parse the next definition in the input.
    pub fn parse_definition(&mut self, status: &mut dyn ParserStatus) -> Result<Parsed, ParseError> {
        loop {
            match self.next_token()?.kind {
                TokenKind::Eof => return Ok(Parsed::End),
                TokenKind::CommentOpen => break,
                _ => {}
            }
        }

        let name = self.expect_next(&[TokenKind::Word])?;
        let mut info = ClassInfo::new(name.text);

        let token = expect(&[TokenKind::OpenParen, TokenKind::Newline], self.peek_token()?)?;
        if token.kind == TokenKind::OpenParen {
            self.parse_header(&mut info)?;
        }
        self.expect_next(&[TokenKind::Newline])?;

        if self.peek_token()?.kind == TokenKind::OpenBrace {
            self.parse_attributes(&mut info, status)?;
        }

        info.description = self.parse_description()?;
        self.expect_next(&[TokenKind::CommentClose])?;

        self.resolve_superclasses(&mut info, status);

        if info.is_base() {
            debug!(name = %info.name, "stored base class");
            let name = info.name.clone();
            self.base_classes.insert(name.clone(), info);
            return Ok(Parsed::Base(name));
        }

        let definition = info.into_definition(self.default_color);
        debug!(name = definition.name(), point = definition.is_point(), "parsed entity definition");
        Ok(Parsed::Entity(definition))
    }

    /// `(color) ((min) (max) | ? | word) [spawnflags]`
    fn parse_header(&mut self, info: &mut ClassInfo) -> Result<(), ParseError> {
        info.color = Some(self.parse_color()?);

        let token = expect(&[TokenKind::OpenParen, TokenKind::Word], self.peek_token()?)?;
        if token.kind == TokenKind::OpenParen {
            info.size = Some(self.parse_bounds()?);
        } else if token.kind == TokenKind::Word && token.text == "?" {
            self.next_token()?;
        }

        if self.peek_token()?.is(&[TokenKind::Word, TokenKind::Minus]) {
            let spawnflags = self.parse_spawnflags()?;
            info.attributes.push(AttributeDefinition::Flags(spawnflags));
        }
        Ok(())
    }

    /// Fill unset fields from the named base classes, in declaration order.
    ///
    /// Inherited attributes come first, followed by the class's own.
    pub(crate) fn resolve_superclasses(&self, info: &mut ClassInfo, status: &mut dyn ParserStatus) {
        let superclasses = std::mem::take(&mut info.superclasses);
        let mut attributes = Vec::new();

        for (name, location) in &superclasses {
            match self.base_classes.get(name) {
                Some(base) => info.inherit_from(base, &mut attributes),
                None => status.warn(*location, &format!("Unknown base class '{name}'")),
            }
        }

        attributes.append(&mut info.attributes);
        info.attributes = attributes;
    }

    pub(crate) fn parse_color(&mut self) -> Result<Color, ParseError> {
        self.expect_next(&[TokenKind::OpenParen])?;
        let mut components = [0.0f32; 3];
        for component in &mut components {
            let token = self.expect_next(&[TokenKind::Integer, TokenKind::Decimal])?;
            *component = parse_number(&token)?;
        }
        self.expect_next(&[TokenKind::CloseParen])?;
        Ok(Color::from_components(components))
    }

    pub(crate) fn parse_vector(&mut self) -> Result<Vec3, ParseError> {
        let mut components = [0.0f64; 3];
        for component in &mut components {
            let token = self.expect_next(&[TokenKind::Integer, TokenKind::Decimal])?;
            *component = parse_number(&token)?;
        }
        let [x, y, z] = components;
        Ok(Vec3::new(x, y, z))
    }

    pub(crate) fn parse_bounds(&mut self) -> Result<BoundingBox, ParseError> {
        self.expect_next(&[TokenKind::OpenParen])?;
        let min = self.parse_vector()?;
        self.expect_next(&[TokenKind::CloseParen])?;
        self.expect_next(&[TokenKind::OpenParen])?;
        let max = self.parse_vector()?;
        self.expect_next(&[TokenKind::CloseParen])?;
        Ok(BoundingBox::new(min, max).repair())
    }

    /// Flag names up to the end of the header line; `-` reserves a bit.
    pub(crate) fn parse_spawnflags(&mut self) -> Result<FlagsAttribute, ParseError> {
        let mut flags = FlagsAttribute::new(SPAWNFLAGS);
        let mut bit = 0u32;

        while self.peek_token()?.is(&[TokenKind::Word, TokenKind::Minus]) {
            let token = self.next_token()?;
            let value = 1u32.checked_shl(bit).ok_or_else(|| {
                ParseError::invalid("too many spawnflags, at most 32 are supported", token.location)
            })?;
            let name = if token.kind == TokenKind::Word { token.text } else { "" };
            flags.add_option(value, name);
            bit += 1;
        }
        Ok(flags)
    }

    fn parse_attributes(
        &mut self,
        info: &mut ClassInfo,
        status: &mut dyn ParserStatus,
    ) -> Result<(), ParseError> {
        self.expect_next(&[TokenKind::OpenBrace])?;
        loop {
            let token = self.expect_next_ignoring_newlines(&[TokenKind::Word, TokenKind::CloseBrace])?;
            if token.kind == TokenKind::CloseBrace {
                return Ok(());
            }
            self.parse_attribute(token, info, status)?;
            self.expect_next_ignoring_newlines(&[TokenKind::Semicolon])?;
        }
    }

    fn parse_attribute(
        &mut self,
        key: Token<'a>,
        info: &mut ClassInfo,
        status: &mut dyn ParserStatus,
    ) -> Result<(), ParseError> {
        match key.text {
            // defaults are accepted but not kept
            "default" => self.parse_default_attribute(),
            "base" => {
                let name = self.parse_base_attribute()?;
                info.superclasses.push((name, key.location));
                Ok(())
            }
            "choice" => {
                let choice = self.parse_choice_attribute()?;
                info.attributes.push(AttributeDefinition::Choice(choice));
                Ok(())
            }
            "model" => {
                info.model = Some(self.parse_model(status)?);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn parse_default_attribute(&mut self) -> Result<(), ParseError> {
        self.expect_next_ignoring_newlines(&[TokenKind::OpenParen])?;
        self.expect_next_ignoring_newlines(&[TokenKind::QuotedString])?;
        self.expect_next_ignoring_newlines(&[TokenKind::Comma])?;
        self.expect_next_ignoring_newlines(&[TokenKind::QuotedString])?;
        self.expect_next_ignoring_newlines(&[TokenKind::CloseParen])?;
        Ok(())
    }

    fn parse_base_attribute(&mut self) -> Result<String, ParseError> {
        self.expect_next_ignoring_newlines(&[TokenKind::OpenParen])?;
        let name = self.expect_next_ignoring_newlines(&[TokenKind::QuotedString])?;
        self.expect_next_ignoring_newlines(&[TokenKind::CloseParen])?;
        Ok(name.string_value().into_owned())
    }

    /// `"name" ( (key, "description") ... )`
    fn parse_choice_attribute(&mut self) -> Result<ChoiceAttribute, ParseError> {
        let name = self.expect_next(&[TokenKind::QuotedString])?;
        let mut options = Vec::new();

        self.expect_next_ignoring_newlines(&[TokenKind::OpenParen])?;
        let mut token = self.next_token_ignoring_newlines()?;
        while token.kind == TokenKind::OpenParen {
            let key = self.expect_next_ignoring_newlines(&[TokenKind::Integer])?;
            let key = key
                .text
                .parse::<i64>()
                .map_err(|_| ParseError::invalid(format!("invalid choice key '{}'", key.text), key.location))?;
            self.expect_next_ignoring_newlines(&[TokenKind::Comma])?;
            let description = self.expect_next_ignoring_newlines(&[TokenKind::QuotedString])?;
            options.push(ChoiceOption::new(key, description.string_value()));
            self.expect_next_ignoring_newlines(&[TokenKind::CloseParen])?;
            token = self.next_token_ignoring_newlines()?;
        }
        expect(&[TokenKind::CloseParen], token)?;

        Ok(ChoiceAttribute {
            name: name.string_value().into_owned(),
            options,
        })
    }

    fn parse_description(&mut self) -> Result<String, ParseError> {
        if self.peek_token()?.kind == TokenKind::CommentClose {
            return Ok(String::new());
        }
        Ok(self.lexer.read_until_marker("*/").trim().to_string())
    }
}

fn parse_number<T: std::str::FromStr>(token: &Token<'_>) -> Result<T, ParseError> {
    token
        .text
        .parse()
        .map_err(|_| ParseError::invalid(format!("invalid number '{}'", token.text), token.location))
}
