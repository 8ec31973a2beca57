//! Conditional color rules
//!
//! Rules are evaluated top to bottom; the first match wins. Numeric
//! comparisons accept numbers and numeric strings.

use genpart_doc::schema::{ColorRule, ColoringDef, Condition};
use serde_json::Value;
use std::collections::HashMap;

/// Normalized scalar operand
#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Num(f64),
    Str(String),
}

impl Scalar {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(Self::Num),
            Value::String(s) => {
                let trimmed = s.trim();
                match trimmed.parse::<f64>() {
                    Ok(n) if n.is_finite() => Some(Self::Num(n)),
                    _ => Some(Self::Str(trimmed.to_string())),
                }
            }
            _ => None,
        }
    }

    fn as_num(&self) -> Option<f64> {
        match self {
            Self::Num(n) => Some(*n),
            Self::Str(_) => None,
        }
    }
}

#[allow(clippy::float_cmp)]
fn same(a: &Scalar, b: &Scalar) -> bool {
    match (a, b) {
        (Scalar::Num(x), Scalar::Num(y)) => x == y,
        (Scalar::Str(x), Scalar::Str(y)) => x == y,
        _ => false,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn compare(value: &Scalar, threshold: &Value, op: fn(f64, f64) -> bool) -> bool {
    match (value.as_num(), Scalar::from_value(threshold).and_then(|t| t.as_num())) {
        (Some(v), Some(t)) => op(v, t),
        _ => false,
    }
}

fn equals(value: &Scalar, expected: &Value) -> bool {
    Scalar::from_value(expected).is_some_and(|e| same(value, &e))
}

fn contains(value: &Scalar, values: &[Value]) -> bool {
    values.iter().any(|v| equals(value, v))
}

/// Evaluate one condition against a cell value
#[must_use]
pub fn matches(condition: &Condition, value: &Value) -> bool {
    match condition {
        Condition::IsEmpty => return is_blank(value),
        Condition::IsNotEmpty => return !is_blank(value),
        _ => {}
    }
    let Some(v) = Scalar::from_value(value) else {
        return false;
    };
    match condition {
        Condition::Lt { value: t } => compare(&v, t, |a, b| a < b),
        Condition::Lte { value: t } => compare(&v, t, |a, b| a <= b),
        Condition::Gt { value: t } => compare(&v, t, |a, b| a > b),
        Condition::Gte { value: t } => compare(&v, t, |a, b| a >= b),
        Condition::Eq { value: e } => equals(&v, e),
        Condition::Neq { value: e } => !equals(&v, e),
        Condition::Between {
            min,
            max,
            inclusive,
        } => v.as_num().is_some_and(|n| {
            if *inclusive {
                n >= *min && n <= *max
            } else {
                n >= *min && n < *max
            }
        }),
        Condition::In { values } => contains(&v, values),
        Condition::NotIn { values } => !contains(&v, values),
        Condition::IsEmpty | Condition::IsNotEmpty => false,
    }
}

/// Color of the first matching rule
#[must_use]
pub fn color_for<'a>(rules: &'a [ColorRule], value: &Value) -> Option<&'a str> {
    rules
        .iter()
        .find(|rule| matches(&rule.condition, value))
        .map(|rule| rule.color.as_str())
}

/// Named, reusable rule list
#[derive(Debug, Clone, PartialEq)]
pub struct ColorPreset {
    /// Preset id
    pub id: String,
    /// Display label
    pub label: String,
    /// Rules, evaluated in order
    pub rules: Vec<ColorRule>,
}

/// Graded scale from -3 to +1
#[must_use]
pub fn num_graded_preset() -> ColorPreset {
    ColorPreset {
        id: "num-graded".to_string(),
        label: "Graded scale -3 to +1".to_string(),
        rules: vec![
            ColorRule::new(Condition::Lt { value: Value::from(-3) }, "red"),
            ColorRule::new(
                Condition::Between {
                    min: -3.0,
                    max: -1.0,
                    inclusive: false,
                },
                "orange",
            ),
            ColorRule::new(
                Condition::Between {
                    min: -1.0,
                    max: 0.0,
                    inclusive: false,
                },
                "yellow",
            ),
            ColorRule::new(
                Condition::Between {
                    min: 0.0,
                    max: 1.0,
                    inclusive: true,
                },
                "green",
            ),
        ],
    }
}

/// Preset lookup for column coloring
#[derive(Debug, Clone)]
pub struct ColorPresets {
    presets: HashMap<String, ColorPreset>,
}

impl Default for ColorPresets {
    fn default() -> Self {
        let mut presets = Self::empty();
        presets.register(num_graded_preset());
        presets
    }
}

impl ColorPresets {
    /// Registry with no presets
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self {
            presets: HashMap::new(),
        }
    }

    /// Register or replace a preset
    pub fn register(&mut self, preset: ColorPreset) {
        self.presets.insert(preset.id.clone(), preset);
    }

    /// Preset by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ColorPreset> {
        self.presets.get(id)
    }

    /// Effective rules of a column: known preset first, inline rules otherwise
    #[must_use]
    pub fn rules_for<'a>(&'a self, coloring: &'a ColoringDef) -> &'a [ColorRule] {
        coloring
            .preset_id
            .as_deref()
            .and_then(|id| self.get(id))
            .map_or(coloring.rules.as_slice(), |preset| preset.rules.as_slice())
    }

    /// Color of a cell value under a column's coloring
    #[must_use]
    pub fn color<'a>(&'a self, coloring: Option<&'a ColoringDef>, value: &Value) -> Option<&'a str> {
        coloring.and_then(|c| color_for(self.rules_for(c), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn graded_precedence() {
        let rules = num_graded_preset().rules;
        assert_eq!(color_for(&rules, &json!(-1)), Some("yellow"));
        assert_eq!(color_for(&rules, &json!(1)), Some("green"));
        assert_eq!(color_for(&rules, &json!(-4)), Some("red"));
        assert_eq!(color_for(&rules, &json!(-3)), Some("orange"));
        assert_eq!(color_for(&rules, &json!("0.5")), Some("green"));
        assert_eq!(color_for(&rules, &json!(2)), None);
        assert_eq!(color_for(&rules, &json!("n/a")), None);
    }

    #[test]
    fn emptiness_checks_run_before_coercion() {
        assert!(matches(&Condition::IsEmpty, &json!(null)));
        assert!(matches(&Condition::IsEmpty, &json!("  ")));
        assert!(!matches(&Condition::IsEmpty, &json!(0)));
        assert!(matches(&Condition::IsNotEmpty, &json!(false)));
    }

    #[test]
    fn equality_and_membership() {
        assert!(matches(&Condition::Eq { value: json!(3) }, &json!("3")));
        assert!(matches(&Condition::Eq { value: json!("foo") }, &json!(" foo ")));
        assert!(matches(&Condition::Neq { value: json!("foo") }, &json!("bar")));
        assert!(matches(&Condition::In { values: vec![json!("a"), json!(2)] }, &json!(2.0)));
        assert!(matches(&Condition::NotIn { values: vec![json!("a")] }, &json!("b")));
        assert!(!matches(&Condition::Gt { value: json!("x") }, &json!(5)));
        assert!(!matches(&Condition::Lt { value: json!(1) }, &json!(true)));
    }

    #[test]
    fn preset_wins_over_inline_rules() {
        let presets = ColorPresets::default();
        let coloring = ColoringDef {
            preset_id: Some("num-graded".into()),
            rules: vec![ColorRule::new(Condition::IsNotEmpty, "blue")],
        };
        assert_eq!(presets.color(Some(&coloring), &json!(-4)), Some("red"));
        let unknown = ColoringDef {
            preset_id: Some("missing".into()),
            ..coloring
        };
        assert_eq!(presets.color(Some(&unknown), &json!(-4)), Some("blue"));
        assert_eq!(presets.color(None, &json!(-4)), None);
    }
}
