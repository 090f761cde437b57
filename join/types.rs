// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================

// This file is ONLY for types that are SHARED BETWEEN FILES, not types that only are used in one file.

use itertools::Itertools;
use std::fmt;

/// Separator placed between the imputed values of one encoded feature vector.
pub const FEATURE_SEPARATOR: char = '_';

/// One row of the feature reference table: a trial identifier and its raw
/// feature values, where `None` marks an empty (missing) cell.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub identifier: String,
    pub values: Vec<Option<f64>>,
}

impl FeatureRecord {
    /// Replaces every missing value with the default at the same position.
    pub fn impute(&self, defaults: &DefaultVector) -> Vec<f64> {
        debug_assert_eq!(self.values.len(), defaults.len());
        self.values
            .iter()
            .zip(defaults.as_slice())
            .map(|(value, &default)| value.unwrap_or(default))
            .collect()
    }
}

/// Per-column medians of the observed feature values. Computed once per run,
/// before any row is imputed.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultVector(Vec<f64>);

impl DefaultVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DefaultVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.0.iter().map(|&value| format_float(value)).join(", ");
        write!(f, "[{rendered}]")
    }
}

/// Renders a float the way Python's `repr` does.
///
/// The digits are the shortest that round-trip (taken from `ryu`). Values whose
/// decimal exponent lies in `-4..16` are written positionally and always carry a
/// fractional part (`2.0`, `0.0001`). Everything else uses a signed exponent of at
/// least two digits (`1e-05`, `1.5e+16`).
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let mut buffer = ryu::Buffer::new();
    let shortest = buffer.format_finite(value);
    let (sign, unsigned) = match shortest.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", shortest),
    };
    let (mantissa, exponent) = match unsigned.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i64>().unwrap_or(0)),
        None => (unsigned, 0),
    };
    let (integral, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let all_digits = format!("{integral}{fraction}");
    let significant = all_digits.trim_start_matches('0');
    let digits = significant.trim_end_matches('0');
    if digits.is_empty() {
        return format!("{sign}0.0");
    }

    // The value is 0.<digits> times 10^point.
    let leading_zeros = (all_digits.len() - significant.len()) as i64;
    let point = integral.len() as i64 + exponent - leading_zeros;
    let scientific = point - 1;

    if !(-4..16).contains(&scientific) {
        let (head, tail) = digits.split_at(1);
        let tail = if tail.is_empty() {
            String::new()
        } else {
            format!(".{tail}")
        };
        let exponent_sign = if scientific < 0 { '-' } else { '+' };
        return format!(
            "{sign}{head}{tail}e{exponent_sign}{:02}",
            scientific.unsigned_abs()
        );
    }

    let body = if point <= 0 {
        format!("0.{}{digits}", "0".repeat(point.unsigned_abs() as usize))
    } else {
        let point = point as usize;
        if point < digits.len() {
            format!("{}.{}", &digits[..point], &digits[point..])
        } else {
            format!("{digits}{}.0", "0".repeat(point - digits.len()))
        }
    };
    format!("{sign}{body}")
}

/// The textual form of one imputed feature vector, e.g.
/// `"2.0_1.0_1.0_18.0_65.0_55.0_1.0_60.0"`.
///
/// Each value is rendered by [`format_float`], so integral values keep a trailing
/// `.0` and extreme magnitudes use exponent form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedFeature(String);

impl EncodedFeature {
    pub fn encode(values: &[f64]) -> Self {
        let encoded = values
            .iter()
            .map(|&value| format_float(value))
            .join(&FEATURE_SEPARATOR.to_string());
        Self(encoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the encoding back into its individual value tokens.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split(FEATURE_SEPARATOR)
    }
}

impl fmt::Display for EncodedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A data row of the primary dataset, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialRecord {
    /// 1-based line number of the record in its source file, for error reporting.
    pub line: u64,
    pub fields: Vec<String>,
}

impl TrialRecord {
    /// The trial identifier lives in the first column. A record with no fields has
    /// an empty identifier, which matches a feature row whose identifier cell is empty.
    pub fn identifier(&self) -> &str {
        self.fields.first().map_or("", String::as_str)
    }

    /// Consumes the record and returns its fields with the feature cell appended.
    pub fn with_feature(mut self, feature: &EncodedFeature) -> Vec<String> {
        self.fields.push(feature.as_str().to_owned());
        self.fields
    }
}

/// The output of a join: the extended header and the extended rows, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_values_keep_a_decimal_point() {
        let encoded = EncodedFeature::encode(&[2.0, 1.0, 1.0, 18.0, 65.0, 55.0, 1.0, 60.0]);
        assert_eq!(encoded.as_str(), "2.0_1.0_1.0_18.0_65.0_55.0_1.0_60.0");
    }

    #[test]
    fn fractional_values_use_shortest_round_trip_form() {
        let encoded = EncodedFeature::encode(&[0.1, 36.5, -2.25]);
        assert_eq!(encoded.as_str(), "0.1_36.5_-2.25");
        assert_eq!(encoded.tokens().count(), 3);
    }

    #[test]
    fn extreme_magnitudes_use_a_signed_two_digit_exponent() {
        let encoded = EncodedFeature::encode(&[0.00001, 1e16, 0.0001]);
        assert_eq!(encoded.as_str(), "1e-05_1e+16_0.0001");

        assert_eq!(format_float(1.5e-7), "1.5e-07");
        assert_eq!(format_float(-2.5e-5), "-2.5e-05");
        assert_eq!(format_float(1e22), "1e+22");
        assert_eq!(format_float(123456789012345680.0), "1.2345678901234568e+17");
        assert_eq!(format_float(1e15), "1000000000000000.0");
        assert_eq!(format_float(9999999999999998.0), "9999999999999998.0");
        assert_eq!(format_float(0.00012), "0.00012");
        assert_eq!(format_float(1e100), "1e+100");
        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(-0.0), "-0.0");
    }

    #[test]
    fn default_vector_uses_the_same_rendering() {
        let defaults = DefaultVector::new(vec![0.00005, 2.0, 2e16]);
        assert_eq!(defaults.to_string(), "[5e-05, 2.0, 2e+16]");
    }

    #[test]
    fn impute_fills_only_missing_positions() {
        let record = FeatureRecord {
            identifier: "T1".to_string(),
            values: vec![Some(1.0), None, Some(3.0)],
        };
        let defaults = DefaultVector::new(vec![3.0, 6.0, 5.0]);
        assert_eq!(record.impute(&defaults), vec![1.0, 6.0, 3.0]);
    }

    #[test]
    fn default_vector_displays_as_a_list() {
        let defaults = DefaultVector::new(vec![3.0, 6.0, 5.5]);
        assert_eq!(defaults.to_string(), "[3.0, 6.0, 5.5]");
    }

    #[test]
    fn trial_record_appends_feature_after_existing_fields() {
        let record = TrialRecord {
            line: 2,
            fields: vec!["T1".to_string(), "statusX".to_string()],
        };
        assert_eq!(record.identifier(), "T1");
        let feature = EncodedFeature::encode(&[1.0, 6.0, 3.0]);
        assert_eq!(
            record.with_feature(&feature),
            vec!["T1".to_string(), "statusX".to_string(), "1.0_6.0_3.0".to_string()]
        );
    }
}
