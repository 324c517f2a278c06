//! Price plausibility by product category
//!
//! Each line's product name is mapped to a category with known market price
//! ranges (IDR per category unit). Prices outside the absolute range are
//! treated as likely recognition errors; prices outside the narrower typical
//! range are only noted. Lines that match no category get coarse bounds.

use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::decimal::format_grouped;

use crate::issue::{Issue, IssueKind, Severity};
use crate::model::InvoiceLine;

const UNCATEGORIZED_LOW: Decimal = dec!(1000);
const UNCATEGORIZED_HIGH: Decimal = dec!(500000);

/// A product category with its expected unit and price ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductCategory {
    pub name: &'static str,
    pub unit: &'static str,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub typical_min: Decimal,
    pub typical_max: Decimal,
    /// Representative product names, matched by substring
    pub keywords: &'static [&'static str],
}

impl ProductCategory {
    pub fn typical_range(&self) -> PriceRange {
        PriceRange {
            min: self.typical_min,
            max: self.typical_max,
            unit: self.unit.to_string(),
        }
    }
}

/// Built-in categories, matched in this order
pub const CATEGORIES: [ProductCategory; 9] = [
    ProductCategory {
        name: "vegetables",
        unit: "kg",
        min_price: dec!(3000),
        max_price: dec!(50000),
        typical_min: dec!(8000),
        typical_max: dec!(35000),
        keywords: &[
            "tomato", "potato", "carrot", "onion", "cucumber", "zucchini", "eggplant", "spinach",
            "broccoli", "paprika", "lettuce", "romaine", "kale", "cabbage", "mushroom", "radish",
            "garlic", "ginger", "chili", "bell pepper", "corn", "beans",
        ],
    },
    ProductCategory {
        name: "fruits",
        unit: "kg",
        min_price: dec!(5000),
        max_price: dec!(80000),
        typical_min: dec!(12000),
        typical_max: dec!(60000),
        keywords: &[
            "apple", "orange", "banana", "grape", "strawberry", "mango", "pineapple", "lemon",
            "lime", "watermelon", "dragon fruit", "papaya", "avocado", "coconut",
        ],
    },
    ProductCategory {
        name: "meat",
        unit: "kg",
        min_price: dec!(25000),
        max_price: dec!(200000),
        typical_min: dec!(40000),
        typical_max: dec!(150000),
        keywords: &[
            "beef", "chicken", "pork", "lamb", "sausage", "bacon", "ham", "tenderloin", "breast",
            "thigh", "wing", "ground beef",
        ],
    },
    ProductCategory {
        name: "seafood",
        unit: "kg",
        min_price: dec!(20000),
        max_price: dec!(300000),
        typical_min: dec!(35000),
        typical_max: dec!(200000),
        keywords: &[
            "fish", "salmon", "tuna", "shrimp", "prawn", "crab", "lobster", "mussel", "oyster",
            "squid", "octopus", "mackerel",
        ],
    },
    ProductCategory {
        name: "dairy",
        unit: "pcs",
        min_price: dec!(5000),
        max_price: dec!(100000),
        typical_min: dec!(8000),
        typical_max: dec!(75000),
        keywords: &[
            "milk", "cheese", "yogurt", "butter", "cream", "mascarpone", "ricotta", "mozzarella",
            "emmental", "cheddar", "feta",
        ],
    },
    ProductCategory {
        name: "beverages",
        unit: "pcs",
        min_price: dec!(2000),
        max_price: dec!(50000),
        typical_min: dec!(3000),
        typical_max: dec!(25000),
        keywords: &[
            "water", "juice", "soda", "tea", "coffee", "cola", "beer", "wine", "sprite", "fanta",
        ],
    },
    ProductCategory {
        name: "spices",
        unit: "g",
        min_price: dec!(50),
        max_price: dec!(500),
        typical_min: dec!(100),
        typical_max: dec!(350),
        keywords: &[
            "salt", "pepper", "cumin", "paprika", "oregano", "basil", "thyme", "cinnamon",
            "turmeric", "coriander",
        ],
    },
    ProductCategory {
        name: "grains",
        unit: "kg",
        min_price: dec!(8000),
        max_price: dec!(50000),
        typical_min: dec!(12000),
        typical_max: dec!(35000),
        keywords: &[
            "rice", "pasta", "noodle", "flour", "oat", "quinoa", "buckwheat", "bread", "cereal",
        ],
    },
    ProductCategory {
        name: "oils_sauces",
        unit: "btl",
        min_price: dec!(8000),
        max_price: dec!(80000),
        typical_min: dec!(15000),
        typical_max: dec!(60000),
        keywords: &[
            "olive oil", "sunflower oil", "vegetable oil", "sesame oil", "ketchup", "mayonnaise",
            "mustard", "soy sauce", "vinegar", "worcestershire", "hot sauce",
        ],
    },
];

/// Price multipliers from the line unit to the category unit
const UNIT_CONVERSIONS: [(&str, &str, Decimal); 4] = [
    ("g", "kg", dec!(1000)),
    ("kg", "g", dec!(0.001)),
    ("ml", "l", dec!(1000)),
    ("l", "ml", dec!(0.001)),
];

fn unit_key(unit: &str) -> String {
    let lower = unit.trim().to_lowercase();
    match lower.as_str() {
        "кг" => "kg".into(),
        "г" => "g".into(),
        "л" => "l".into(),
        "мл" => "ml".into(),
        "шт" => "pcs".into(),
        _ => lower,
    }
}

/// Qualitative price confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Unknown,
    Low,
    Medium,
    High,
}

/// Price range shown alongside a finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Decimal,
    pub unit: String,
}

/// One observation about a line price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFinding {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
}

impl PriceFinding {
    fn new(kind: IssueKind, severity: Severity, message: String) -> Self {
        Self { kind, severity, message }
    }

    /// Unit mismatches are context, not price warnings
    fn is_price_warning(&self) -> bool {
        self.kind != IssueKind::UnitMismatch
    }
}

/// Result of checking a single price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceCheck {
    /// False when the price is outside the category's absolute bounds
    pub valid: bool,
    pub category: Option<String>,
    pub confidence: Confidence,
    pub suggested_range: Option<PriceRange>,
    /// Price converted to the category unit
    pub normalized_price: Option<Decimal>,
    pub findings: Vec<PriceFinding>,
}

impl PriceCheck {
    fn unknown() -> Self {
        Self {
            valid: true,
            category: None,
            confidence: Confidence::Unknown,
            suggested_range: None,
            normalized_price: None,
            findings: Vec::new(),
        }
    }

    pub fn warning_count(&self) -> usize {
        self.findings.iter().filter(|f| f.is_price_warning()).count()
    }
}

/// A line whose price is implausible enough to need review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedFix {
    pub line: usize,
    pub product: String,
    pub issue: String,
    pub suggested_range: Option<PriceRange>,
}

/// Invoice-wide price context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceContextReport {
    pub overall_valid: bool,
    pub total_warnings: usize,
    pub category_distribution: BTreeMap<String, usize>,
    pub price_confidence: Confidence,
    pub suggested_fixes: Vec<SuggestedFix>,
    pub recommendations: Vec<String>,
    /// Findings as line-scoped issues
    pub issues: Vec<Issue>,
}

impl Default for InvoiceContextReport {
    fn default() -> Self {
        Self {
            overall_valid: true,
            total_warnings: 0,
            category_distribution: BTreeMap::new(),
            price_confidence: Confidence::Unknown,
            suggested_fixes: Vec::new(),
            recommendations: Vec::new(),
            issues: Vec::new(),
        }
    }
}

/// Checks unit prices against category price ranges
#[derive(Debug, Clone)]
pub struct ContextPriceValidator {
    categories: Vec<ProductCategory>,
}

impl Default for ContextPriceValidator {
    fn default() -> Self {
        Self::new(CATEGORIES.to_vec())
    }
}

impl ContextPriceValidator {
    pub fn new(categories: Vec<ProductCategory>) -> Self {
        Self { categories }
    }

    pub fn category(&self, name: &str) -> Option<&ProductCategory> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Finds the category of a product name
    ///
    /// Substring containment in either direction is tried across all
    /// categories first; only then word overlap of at least 60% of the
    /// shorter name.
    pub fn categorize(&self, product_name: &str) -> Option<&ProductCategory> {
        let product = product_name.trim().to_lowercase();
        if product.is_empty() {
            return None;
        }

        let by_substring = self.categories.iter().find(|category| {
            category
                .keywords
                .iter()
                .any(|keyword| product.contains(keyword) || keyword.contains(product.as_str()))
        });
        if by_substring.is_some() {
            return by_substring;
        }

        let product_words: HashSet<&str> = product.split_whitespace().collect();
        self.categories.iter().find(|category| {
            category.keywords.iter().any(|keyword| {
                let keyword_words: HashSet<&str> = keyword.split_whitespace().collect();
                let shorter = product_words.len().min(keyword_words.len());
                let overlap = product_words.intersection(&keyword_words).count();
                shorter > 0 && overlap * 10 >= shorter * 6
            })
        })
    }

    /// Converts a price to the category unit when a conversion is known
    fn normalize_price(price: Decimal, unit: &str, expected: &str) -> (Decimal, bool) {
        let actual = unit_key(unit);
        if actual.is_empty() || actual == expected {
            return (price, false);
        }
        UNIT_CONVERSIONS
            .iter()
            .find(|(from, to, _)| *from == actual && *to == expected)
            .and_then(|(_, _, factor)| price.checked_mul(*factor))
            .map_or((price, true), |converted| (converted, false))
    }

    /// Checks one unit price
    pub fn validate_price(&self, product_name: &str, price: Decimal, unit: &str) -> PriceCheck {
        let mut check = PriceCheck::unknown();
        if product_name.trim().is_empty() || price <= Decimal::ZERO {
            return check;
        }

        let Some(category) = self.categorize(product_name) else {
            let shown = format_grouped(price);
            if price < UNCATEGORIZED_LOW {
                check.findings.push(PriceFinding::new(
                    IssueKind::PriceTooLow,
                    Severity::Info,
                    format!("Very low price {} IDR - possible OCR error", shown),
                ));
                check.confidence = Confidence::Low;
            } else if price > UNCATEGORIZED_HIGH {
                check.findings.push(PriceFinding::new(
                    IssueKind::PriceTooHigh,
                    Severity::Info,
                    format!("Very high price {} IDR - verify correctness", shown),
                ));
                check.confidence = Confidence::Low;
            } else {
                check.confidence = Confidence::Medium;
            }
            return check;
        };

        check.category = Some(category.name.to_string());
        check.suggested_range = Some(category.typical_range());

        let (normalized, mismatched) = Self::normalize_price(price, unit, category.unit);
        check.normalized_price = Some(normalized);
        if mismatched {
            check.findings.push(PriceFinding::new(
                IssueKind::UnitMismatch,
                Severity::Info,
                format!(
                    "Unit {} differs from expected {} for {}; price compared as is",
                    unit.trim(),
                    category.unit,
                    category.name
                ),
            ));
        }

        let shown = format_grouped(normalized);
        let typical = format!(
            "{}-{}",
            format_grouped(category.typical_min),
            format_grouped(category.typical_max)
        );

        if normalized < category.min_price || normalized > category.max_price {
            let (kind, word) = if normalized < category.min_price {
                (IssueKind::PriceTooLow, "low")
            } else {
                (IssueKind::PriceTooHigh, "high")
            };
            check.findings.push(PriceFinding::new(
                kind,
                Severity::Warning,
                format!(
                    "Unusually {} price for {}: {} IDR/{} (expected: {})",
                    word, category.name, shown, category.unit, typical
                ),
            ));
            check.confidence = Confidence::Low;
            check.valid = false;
        } else if normalized < category.typical_min || normalized > category.typical_max {
            check.findings.push(PriceFinding::new(
                IssueKind::PriceAtypical,
                Severity::Info,
                format!(
                    "Price outside typical range for {}: {} IDR/{} (typical: {})",
                    category.name, shown, category.unit, typical
                ),
            ));
            check.confidence = Confidence::Medium;
        } else {
            check.confidence = Confidence::High;
        }

        check
    }

    /// Checks every priced line and grades the invoice as a whole
    pub fn validate_invoice_context(&self, lines: &[InvoiceLine]) -> InvoiceContextReport {
        let mut report = InvoiceContextReport::default();
        let (mut high, mut medium, mut priced) = (0usize, 0usize, 0usize);

        for line in lines {
            let Some(price) = line.unit_price.filter(|p| *p > Decimal::ZERO) else {
                continue;
            };
            priced += 1;

            let check = self.validate_price(&line.name, price, &line.unit);
            match check.confidence {
                Confidence::High => high += 1,
                Confidence::Medium => medium += 1,
                _ => {}
            }

            if let Some(category) = &check.category {
                *report.category_distribution.entry(category.clone()).or_default() += 1;
            }

            report.total_warnings += check.warning_count();
            if !check.valid {
                report.overall_valid = false;
                if let Some(first) = check.findings.iter().find(|f| f.is_price_warning()) {
                    report.suggested_fixes.push(SuggestedFix {
                        line: line.index,
                        product: line.name.clone(),
                        issue: first.message.clone(),
                        suggested_range: check.suggested_range.clone(),
                    });
                }
            }

            report.issues.extend(check.findings.into_iter().map(|finding| {
                Issue::new(finding.kind, finding.severity, finding.message).on_line(line.index)
            }));
        }

        report.price_confidence = match priced {
            0 => Confidence::Unknown,
            n if high * 10 >= n * 7 => Confidence::High,
            n if (high + medium) * 2 >= n => Confidence::Medium,
            _ => Confidence::Low,
        };

        if report.total_warnings > 0 {
            report.recommendations = Self::recommendations(&report);
        }

        debug!(
            priced,
            warnings = report.total_warnings,
            confidence = ?report.price_confidence,
            "Price context evaluated"
        );
        report
    }

    fn recommendations(report: &InvoiceContextReport) -> Vec<String> {
        let mut recommendations = Vec::new();
        if report.price_confidence == Confidence::Low {
            recommendations.push(
                "Low price confidence detected. Review OCR results carefully for number recognition errors."
                    .to_string(),
            );
        }
        if report.total_warnings > 3 {
            recommendations.push(
                "Multiple price warnings detected. Consider re-scanning the image or manually verifying prices."
                    .to_string(),
            );
        }
        if !report.suggested_fixes.is_empty() {
            recommendations.push(format!(
                "Review {} positions with price anomalies.",
                report.suggested_fixes.len()
            ));
        }
        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_by_keyword() {
        let validator = ContextPriceValidator::default();
        assert_eq!(validator.categorize("beef tenderloin").map(|c| c.name), Some("meat"));
        assert_eq!(validator.categorize("Cherry Tomato").map(|c| c.name), Some("vegetables"));
        assert_eq!(validator.categorize("Fresh Milk 1L").map(|c| c.name), Some("dairy"));
        assert_eq!(validator.categorize("  ").map(|c| c.name), None);
    }

    #[test]
    fn test_categorize_prefers_first_category() {
        let validator = ContextPriceValidator::default();
        // paprika appears under vegetables and spices
        assert_eq!(validator.categorize("paprika").map(|c| c.name), Some("vegetables"));
    }

    #[test]
    fn test_categorize_unknown_product() {
        let validator = ContextPriceValidator::default();
        assert!(validator.categorize("dish soap").is_none());
    }

    #[test]
    fn test_extreme_price_invalid_low_confidence() {
        let validator = ContextPriceValidator::default();
        let check = validator.validate_price("beef tenderloin", dec!(1000000), "kg");

        assert!(!check.valid);
        assert_eq!(check.confidence, Confidence::Low);
        assert_eq!(check.category.as_deref(), Some("meat"));
        assert_eq!(check.findings[0].kind, IssueKind::PriceTooHigh);
        assert_eq!(
            check.findings[0].message,
            "Unusually high price for meat: 1,000,000 IDR/kg (expected: 40,000-150,000)"
        );
    }

    #[test]
    fn test_atypical_price_is_valid_medium() {
        let validator = ContextPriceValidator::default();
        let check = validator.validate_price("chicken breast", dec!(30000), "kg");

        assert!(check.valid);
        assert_eq!(check.confidence, Confidence::Medium);
        assert_eq!(check.findings[0].kind, IssueKind::PriceAtypical);
    }

    #[test]
    fn test_typical_price_high_confidence() {
        let validator = ContextPriceValidator::default();
        let check = validator.validate_price("salmon fillet", dec!(120000), "kg");

        assert!(check.valid);
        assert_eq!(check.confidence, Confidence::High);
        assert!(check.findings.is_empty());
    }

    #[test]
    fn test_price_converted_to_category_unit() {
        let validator = ContextPriceValidator::default();
        // 15 IDR per gram is 15,000 IDR per kg
        let check = validator.validate_price("carrot", dec!(15), "g");

        assert_eq!(check.normalized_price, Some(dec!(15000)));
        assert_eq!(check.confidence, Confidence::High);
    }

    #[test]
    fn test_conversion_beyond_decimal_range_compares_as_is() {
        let validator = ContextPriceValidator::default();
        let check = validator.validate_price("carrot", Decimal::MAX, "g");

        assert_eq!(check.normalized_price, Some(Decimal::MAX));
        assert_eq!(check.findings[0].kind, IssueKind::UnitMismatch);
        assert!(!check.valid);
    }

    #[test]
    fn test_unit_mismatch_noted() {
        let validator = ContextPriceValidator::default();
        let check = validator.validate_price("potato", dec!(15000), "box");

        assert_eq!(check.findings[0].kind, IssueKind::UnitMismatch);
        assert_eq!(check.warning_count(), 0);
        assert_eq!(check.confidence, Confidence::High);
    }

    #[test]
    fn test_uncategorized_bounds() {
        let validator = ContextPriceValidator::default();

        let low = validator.validate_price("dish soap", dec!(500), "pcs");
        assert_eq!(low.confidence, Confidence::Low);
        assert!(low.valid);
        assert_eq!(low.findings[0].message, "Very low price 500 IDR - possible OCR error");

        let medium = validator.validate_price("dish soap", dec!(25000), "pcs");
        assert_eq!(medium.confidence, Confidence::Medium);
    }

    #[test]
    fn test_invoice_context_aggregation() {
        let validator = ContextPriceValidator::default();
        let lines = vec![
            InvoiceLine::new(1, "Tomato", dec!(2), "kg", dec!(15000), dec!(30000)),
            InvoiceLine::new(2, "Beef tenderloin", dec!(1), "kg", dec!(1500000), dec!(1500000)),
            InvoiceLine::new(3, "Rice", dec!(5), "kg", dec!(14000), dec!(70000)),
            InvoiceLine::blank(4).with_name("Napkins"),
        ];

        let report = validator.validate_invoice_context(&lines);

        assert!(!report.overall_valid);
        assert_eq!(report.total_warnings, 1);
        assert_eq!(report.price_confidence, Confidence::Medium);
        assert_eq!(report.category_distribution.get("vegetables"), Some(&1));
        assert_eq!(report.category_distribution.get("meat"), Some(&1));
        assert_eq!(report.suggested_fixes.len(), 1);
        assert_eq!(report.suggested_fixes[0].line, 2);
        assert_eq!(report.issues[0].line_ref, Some(2));
        assert_eq!(report.recommendations, vec!["Review 1 positions with price anomalies.".to_string()]);
    }

    #[test]
    fn test_empty_invoice_context() {
        let report = ContextPriceValidator::default().validate_invoice_context(&[]);
        assert!(report.overall_valid);
        assert_eq!(report.price_confidence, Confidence::Unknown);
        assert!(report.recommendations.is_empty());
    }
}
