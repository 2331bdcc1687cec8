//! Flight-category classification.
//!
//! Two numeric features, effective ceiling and visibility, are derived
//! from a decoded report and run through the configured rule table.
//! Classification is a pure function of (features, rules): no state, no
//! I/O, fully reproducible with a synthetic table.

use tracing::warn;

use crate::config::CategoryRule;
use crate::error::ConfigError;
use crate::expr::Expr;
use crate::model::{DecodedMetar, Rgb};

/// The two features every rule is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Features {
    pub ceiling_ft: f64,
    pub visibility_mi: f64,
}

/// A matched flight category, detached from the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub color: Rgb,
    pub icon: String,
}

/// Derive classification features from a decoded report.
///
/// The ceiling is the lowest base among layers whose code is in
/// `ceiling_codes`; with no such layer it falls back to
/// `default_ceiling_ft` (effectively unlimited). Absent cloud data is a
/// valid, common case, not an error.
pub fn extract(decoded: &DecodedMetar, ceiling_codes: &[String], default_ceiling_ft: u32) -> Features {
    let ceiling_ft = decoded
        .clouds
        .iter()
        .filter(|layer| ceiling_codes.iter().any(|code| code == &layer.code))
        .map(|layer| layer.base_ft_agl)
        .min()
        .unwrap_or(default_ceiling_ft);

    Features {
        ceiling_ft: f64::from(ceiling_ft),
        visibility_mi: decoded.visibility_mi,
    }
}

#[derive(Debug)]
struct CompiledRule {
    category: Category,
    clauses: Vec<Expr>,
}

impl CompiledRule {
    /// A rule matches when any of its clauses holds.
    fn matches(&self, features: &Features) -> bool {
        self.clauses.iter().any(|clause| clause.matches(features))
    }
}

/// The configured rule table, expressions compiled once at startup.
#[derive(Debug)]
pub struct Classifier {
    rules: Vec<CompiledRule>,
}

impl Classifier {
    pub fn compile(rules: &[CategoryRule]) -> Result<Self, ConfigError> {
        if rules.is_empty() {
            return Err(ConfigError::EmptyRuleTable);
        }

        let rules = rules
            .iter()
            .map(|rule| {
                let clauses = rule
                    .expression
                    .iter()
                    .map(|clause| {
                        Expr::parse(clause).map_err(|source| ConfigError::InvalidExpression {
                            category: rule.name.clone(),
                            expression: clause.clone(),
                            source,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(CompiledRule {
                    category: Category {
                        name: rule.name.clone(),
                        color: rule.color,
                        icon: rule.icon.clone(),
                    },
                    clauses,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self { rules })
    }

    /// Return the matching category, or `None` when no rule matches.
    ///
    /// The table is ordered by ascending severity, so of all matching
    /// rules the last one wins. A miss is not an error; the caller
    /// substitutes the fault category.
    pub fn classify(&self, features: &Features) -> Option<&Category> {
        let matched = self
            .rules
            .iter()
            .rev()
            .find(|rule| rule.matches(features))
            .map(|rule| &rule.category);

        if matched.is_none() {
            warn!(
                ceiling_ft = features.ceiling_ft,
                visibility_mi = features.visibility_mi,
                "no flight category matched; the rule table may have a gap"
            );
        }

        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CloudLayer;

    fn rule(name: &str, color: Rgb, expression: &[&str]) -> CategoryRule {
        CategoryRule {
            name: name.to_string(),
            color,
            icon: format!("{name}-icon"),
            expression: expression.iter().map(ToString::to_string).collect(),
        }
    }

    fn layer(code: &str, base_ft_agl: u32) -> CloudLayer {
        CloudLayer {
            code: code.to_string(),
            base_ft_agl,
        }
    }

    fn ceiling_codes() -> Vec<String> {
        vec!["BKN".to_string(), "OVC".to_string(), "VV".to_string()]
    }

    #[test]
    fn extract_defaults_ceiling_without_significant_layers() {
        let decoded = DecodedMetar {
            visibility_mi: 10.0,
            clouds: vec![layer("FEW", 2500), layer("SCT", 4000)],
        };
        let features = extract(&decoded, &ceiling_codes(), 12_000);
        assert_eq!(features.ceiling_ft, 12_000.0);
        assert_eq!(features.visibility_mi, 10.0);
    }

    #[test]
    fn extract_takes_lowest_significant_base() {
        let decoded = DecodedMetar {
            visibility_mi: 6.0,
            clouds: vec![layer("SCT", 800), layer("OVC", 3500), layer("BKN", 1200)],
        };
        let features = extract(&decoded, &ceiling_codes(), 12_000);
        assert_eq!(features.ceiling_ft, 1200.0);
    }

    #[test]
    fn last_matching_rule_wins() {
        let classifier = Classifier::compile(&[
            rule("GOOD", Rgb::new(0, 255, 0), &["visibility >= 0"]),
            rule("WORSE", Rgb::new(0, 0, 255), &["visibility < 5"]),
            rule("WORST", Rgb::new(255, 0, 0), &["visibility < 1"]),
        ])
        .expect("compiles");

        let pick = |vis: f64| {
            classifier
                .classify(&Features {
                    ceiling_ft: 12_000.0,
                    visibility_mi: vis,
                })
                .map(|c| c.name.clone())
        };

        assert_eq!(pick(10.0).as_deref(), Some("GOOD"));
        assert_eq!(pick(4.0).as_deref(), Some("WORSE"));
        assert_eq!(pick(0.5).as_deref(), Some("WORST"));
    }

    #[test]
    fn clauses_combine_as_or() {
        let classifier = Classifier::compile(&[rule(
            "LOW",
            Rgb::new(255, 0, 0),
            &["ceiling < 1000", "visibility < 3"],
        )])
        .expect("compiles");

        let low_ceiling = Features {
            ceiling_ft: 500.0,
            visibility_mi: 10.0,
        };
        let low_visibility = Features {
            ceiling_ft: 12_000.0,
            visibility_mi: 2.0,
        };
        let clear = Features {
            ceiling_ft: 12_000.0,
            visibility_mi: 10.0,
        };

        assert!(classifier.classify(&low_ceiling).is_some());
        assert!(classifier.classify(&low_visibility).is_some());
        assert!(classifier.classify(&clear).is_none());
    }

    #[test]
    fn no_match_yields_none() {
        let classifier =
            Classifier::compile(&[rule("NARROW", Rgb::new(1, 2, 3), &["visibility < 1"])])
                .expect("compiles");

        let features = Features {
            ceiling_ft: 12_000.0,
            visibility_mi: 10.0,
        };
        assert!(classifier.classify(&features).is_none());
    }

    #[test]
    fn classification_is_deterministic() {
        let classifier = Classifier::compile(&[
            rule("A", Rgb::new(0, 255, 0), &["ceiling > 3000"]),
            rule("B", Rgb::new(255, 0, 0), &["ceiling <= 3000"]),
        ])
        .expect("compiles");

        let features = Features {
            ceiling_ft: 3000.0,
            visibility_mi: 7.0,
        };

        let first = classifier.classify(&features).map(|c| c.name.clone());
        for _ in 0..100 {
            assert_eq!(classifier.classify(&features).map(|c| c.name.clone()), first);
        }
        assert_eq!(first.as_deref(), Some("B"));
    }

    #[test]
    fn classifier_formats_for_diagnostics() {
        let classifier =
            Classifier::compile(&[rule("GOOD", Rgb::new(0, 255, 0), &["visibility >= 0"])])
                .expect("compiles");
        let rendered = format!("{classifier:?}");
        assert!(rendered.contains("GOOD"));
    }

    #[test]
    fn compile_rejects_bad_expressions() {
        let err = Classifier::compile(&[rule("BAD", Rgb::new(0, 0, 0), &["ceiling <"])]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidExpression { .. }));
    }
}
