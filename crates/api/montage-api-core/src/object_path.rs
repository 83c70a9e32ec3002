//! ObjectPath tokenizing and formatting.
//!
//! Grammar:
//!   SceneName.ClipName[EffectId][PropertyId]
//!   SceneName.ClipName[EffectId][GroupId][PropertyId]
//!
//! The text is tokenized into typed segments (names separated by `.`, decimal ids in
//! brackets) and the resulting sequence is then checked for shape: exactly two name
//! segments followed by two or three id segments. Names may contain any character
//! except `.`, `[`, `]` and whitespace.
//!
//! Examples:
//!   "Scene1.Clip2[3][4]"    -> [Name("Scene1"), Name("Clip2"), Id(3), Id(4)]
//!   "Intro.Title[7][8][12]" -> [Name("Intro"), Name("Title"), Id(7), Id(8), Id(12)]

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const NAME_SEGMENTS: usize = 2;
pub const MIN_ID_SEGMENTS: usize = 2;
pub const MAX_ID_SEGMENTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Name(String),
    Id(u64),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PathSyntaxError {
    #[error("empty path")]
    Empty,
    #[error("unexpected '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("empty name segment at offset {offset}")]
    EmptyName { offset: usize },
    #[error("invalid id '{text}' at offset {offset}")]
    InvalidId { text: String, offset: usize },
    #[error("unterminated id starting at offset {offset}")]
    UnterminatedId { offset: usize },
    #[error("expected 2 names followed by 2 or 3 ids, found {names} names and {ids} ids")]
    Shape { names: usize, ids: usize },
}

/// Structured address of a bindable property inside a document tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectPath {
    segments: Vec<PathSegment>,
}

impl ObjectPath {
    /// Path of a property owned directly by an effect.
    pub fn property(
        scene: impl Into<String>,
        clip: impl Into<String>,
        effect: u64,
        property: u64,
    ) -> Result<Self, PathSyntaxError> {
        Self::from_segments(vec![
            PathSegment::Name(scene.into()),
            PathSegment::Name(clip.into()),
            PathSegment::Id(effect),
            PathSegment::Id(property),
        ])
    }

    /// Path of a property nested one group below an effect.
    pub fn grouped_property(
        scene: impl Into<String>,
        clip: impl Into<String>,
        effect: u64,
        group: u64,
        property: u64,
    ) -> Result<Self, PathSyntaxError> {
        Self::from_segments(vec![
            PathSegment::Name(scene.into()),
            PathSegment::Name(clip.into()),
            PathSegment::Id(effect),
            PathSegment::Id(group),
            PathSegment::Id(property),
        ])
    }

    /// Build a path from already-typed segments. Names are checked so that the text
    /// form re-tokenizes to the same segments.
    pub fn from_segments(segments: Vec<PathSegment>) -> Result<Self, PathSyntaxError> {
        for seg in &segments {
            if let PathSegment::Name(name) = seg {
                check_name(name, 0)?;
            }
        }
        check_shape(&segments)?;
        Ok(Self { segments })
    }

    /// Tokenize and shape-check a path string.
    pub fn parse(s: &str) -> Result<Self, PathSyntaxError> {
        let segments = tokenize(s)?;
        check_shape(&segments)?;
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn scene(&self) -> &str {
        self.name_at(0)
    }

    pub fn clip(&self) -> &str {
        self.name_at(1)
    }

    /// Id segments in root-to-leaf order (effect, [group], property).
    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.segments.iter().filter_map(|seg| match seg {
            PathSegment::Id(id) => Some(*id),
            PathSegment::Name(_) => None,
        })
    }

    /// True for the `[Effect][Group][Property]` form.
    pub fn is_grouped(&self) -> bool {
        self.ids().count() == MAX_ID_SEGMENTS
    }

    fn name_at(&self, index: usize) -> &str {
        match self.segments.get(index) {
            Some(PathSegment::Name(name)) => name,
            _ => "",
        }
    }
}

/// Split a path string into typed segments without checking the overall shape.
pub fn tokenize(s: &str) -> Result<Vec<PathSegment>, PathSyntaxError> {
    if s.is_empty() {
        return Err(PathSyntaxError::Empty);
    }
    let mut segments = Vec::new();
    let mut chars = s.char_indices().peekable();
    let mut seen_id = false;
    let mut expect_name = false;

    while let Some(&(offset, ch)) = chars.peek() {
        match ch {
            '[' => {
                chars.next();
                let start = offset + 1;
                let mut end = None;
                for (i, c) in chars.by_ref() {
                    if c == ']' {
                        end = Some(i);
                        break;
                    }
                }
                let end = end.ok_or(PathSyntaxError::UnterminatedId { offset })?;
                let text = &s[start..end];
                if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(PathSyntaxError::InvalidId {
                        text: text.to_string(),
                        offset: start,
                    });
                }
                let id = text.parse::<u64>().map_err(|_| PathSyntaxError::InvalidId {
                    text: text.to_string(),
                    offset: start,
                })?;
                segments.push(PathSegment::Id(id));
                seen_id = true;
            }
            '.' => {
                // A dot separates two names; it may not lead, trail, or follow an id.
                let after_name = matches!(segments.last(), Some(PathSegment::Name(_)));
                if !after_name || seen_id {
                    return Err(PathSyntaxError::UnexpectedChar { ch, offset });
                }
                chars.next();
                match chars.peek() {
                    Some(&(_, c)) if is_name_char(c) => {}
                    _ => return Err(PathSyntaxError::EmptyName { offset: offset + 1 }),
                }
                expect_name = true;
            }
            c if is_name_char(c) => {
                let follows_name = matches!(segments.last(), Some(PathSegment::Name(_)));
                if seen_id || (follows_name && !expect_name) {
                    return Err(PathSyntaxError::UnexpectedChar { ch, offset });
                }
                let mut end = s.len();
                while let Some(&(i, c)) = chars.peek() {
                    if !is_name_char(c) {
                        end = i;
                        break;
                    }
                    chars.next();
                }
                segments.push(PathSegment::Name(s[offset..end].to_string()));
                expect_name = false;
            }
            _ => return Err(PathSyntaxError::UnexpectedChar { ch, offset }),
        }
    }
    Ok(segments)
}

#[inline]
fn is_name_char(c: char) -> bool {
    !matches!(c, '.' | '[' | ']') && !c.is_whitespace()
}

fn check_name(name: &str, offset: usize) -> Result<(), PathSyntaxError> {
    if name.is_empty() {
        return Err(PathSyntaxError::EmptyName { offset });
    }
    if let Some((i, ch)) = name.char_indices().find(|&(_, c)| !is_name_char(c)) {
        return Err(PathSyntaxError::UnexpectedChar {
            ch,
            offset: offset + i,
        });
    }
    Ok(())
}

fn check_shape(segments: &[PathSegment]) -> Result<(), PathSyntaxError> {
    let names = segments
        .iter()
        .take_while(|seg| matches!(seg, PathSegment::Name(_)))
        .count();
    let ids = segments.len() - names;
    let ids_only_after_names = segments[names..]
        .iter()
        .all(|seg| matches!(seg, PathSegment::Id(_)));
    if names != NAME_SEGMENTS
        || !ids_only_after_names
        || !(MIN_ID_SEGMENTS..=MAX_ID_SEGMENTS).contains(&ids)
    {
        let total_names = segments
            .iter()
            .filter(|seg| matches!(seg, PathSegment::Name(_)))
            .count();
        return Err(PathSyntaxError::Shape {
            names: total_names,
            ids: segments.len() - total_names,
        });
    }
    Ok(())
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for seg in &self.segments {
            match seg {
                PathSegment::Name(name) => {
                    if !first {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathSegment::Id(id) => write!(f, "[{id}]")?,
            }
            first = false;
        }
        Ok(())
    }
}

impl FromStr for ObjectPath {
    type Err = PathSyntaxError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectPath::parse(s)
    }
}

// Serde support: serialize as string, deserialize from string
impl Serialize for ObjectPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ObjectPath {
    fn deserialize<D>(deserializer: D) -> Result<ObjectPath, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ObjectPath::parse(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_effect_property() {
        let p = ObjectPath::parse("Scene1.Clip2[3][4]").unwrap();
        assert_eq!(p.scene(), "Scene1");
        assert_eq!(p.clip(), "Clip2");
        assert_eq!(p.ids().collect::<Vec<_>>(), vec![3, 4]);
        assert!(!p.is_grouped());
        assert_eq!(p.to_string(), "Scene1.Clip2[3][4]");
    }

    #[test]
    fn parse_grouped_property() {
        let p = ObjectPath::parse("Intro.Title[7][8][12]").unwrap();
        assert!(p.is_grouped());
        assert_eq!(
            p.segments(),
            &[
                PathSegment::Name("Intro".into()),
                PathSegment::Name("Title".into()),
                PathSegment::Id(7),
                PathSegment::Id(8),
                PathSegment::Id(12),
            ]
        );
    }

    #[test]
    fn dot_separates_scene_and_clip_names() {
        assert_eq!(
            tokenize("Scene1.Clip2[3][4]").unwrap(),
            vec![
                PathSegment::Name("Scene1".into()),
                PathSegment::Name("Clip2".into()),
                PathSegment::Id(3),
                PathSegment::Id(4),
            ]
        );
        for p in [
            ObjectPath::property("Scene1", "Clip2", 3, 4).unwrap(),
            ObjectPath::grouped_property("Scene1", "Clip2", 3, 7, 8).unwrap(),
        ] {
            assert_eq!(ObjectPath::parse(&p.to_string()).unwrap(), p);
        }
        assert!(matches!(
            tokenize("A.B[1]C"),
            Err(PathSyntaxError::UnexpectedChar { ch: 'C', offset: 6 })
        ));
    }

    #[test]
    fn non_ascii_names_are_accepted() {
        let p = ObjectPath::parse("シーン.クリップ[1][2]").unwrap();
        assert_eq!(p.scene(), "シーン");
        assert_eq!(p.to_string(), "シーン.クリップ[1][2]");
    }

    #[test]
    fn rejects_bad_tokens() {
        assert_eq!(ObjectPath::parse(""), Err(PathSyntaxError::Empty));
        assert!(matches!(
            ObjectPath::parse("A.B[x][2]"),
            Err(PathSyntaxError::InvalidId { .. })
        ));
        assert!(matches!(
            ObjectPath::parse("A.B[1][2"),
            Err(PathSyntaxError::UnterminatedId { .. })
        ));
        assert!(matches!(
            ObjectPath::parse("A..B[1][2]"),
            Err(PathSyntaxError::EmptyName { .. })
        ));
        assert!(matches!(
            ObjectPath::parse("A.B [1][2]"),
            Err(PathSyntaxError::UnexpectedChar { ch: ' ', .. })
        ));
        assert!(matches!(
            ObjectPath::parse("A.B[1].C[2]"),
            Err(PathSyntaxError::UnexpectedChar { ch: '.', .. })
        ));
    }

    #[test]
    fn rejects_wrong_shape() {
        assert_eq!(
            ObjectPath::parse("A[1][2]"),
            Err(PathSyntaxError::Shape { names: 1, ids: 2 })
        );
        assert_eq!(
            ObjectPath::parse("A.B[1]"),
            Err(PathSyntaxError::Shape { names: 2, ids: 1 })
        );
        assert_eq!(
            ObjectPath::parse("A.B[1][2][3][4]"),
            Err(PathSyntaxError::Shape { names: 2, ids: 4 })
        );
        assert_eq!(
            ObjectPath::parse("A.B.C[1][2]"),
            Err(PathSyntaxError::Shape { names: 3, ids: 2 })
        );
    }

    #[test]
    fn constructors_reject_unformattable_names() {
        assert!(ObjectPath::property("Scene.1", "Clip", 1, 2).is_err());
        assert!(ObjectPath::property("", "Clip", 1, 2).is_err());
        let p = ObjectPath::grouped_property("S", "C", 1, 2, 3).unwrap();
        assert_eq!(p.to_string().parse::<ObjectPath>().unwrap(), p);
    }

    #[test]
    fn serde_as_string() {
        let p = ObjectPath::parse("Scene1.Clip2[3][4]").unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"Scene1.Clip2[3][4]\"");
        let back: ObjectPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
