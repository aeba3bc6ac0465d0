//! Contingency-table significance testing shared by every report.
//!
//! All p-values come from one survival function: the regularized upper
//! incomplete gamma Q(df/2, x/2), evaluated with the power series below
//! `x < a + 1` and a modified Lentz continued fraction above it.

use serde::Serialize;

const GAMMA_MAX_ITERATIONS: usize = 500;
const GAMMA_EPSILON: f64 = 1e-15;
const LENTZ_FLOOR: f64 = 1e-300;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// Non-negative count matrix with labelled rows and columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContingencyTable {
    rows: Vec<String>,
    columns: Vec<String>,
    counts: Vec<Vec<u64>>,
}

impl ContingencyTable {
    pub fn new(rows: Vec<String>, columns: Vec<String>) -> Self {
        let counts = vec![vec![0_u64; columns.len()]; rows.len()];
        Self {
            rows,
            columns,
            counts,
        }
    }

    /// Square table whose row and column label sets are identical.
    pub fn square(labels: Vec<String>) -> Self {
        Self::new(labels.clone(), labels)
    }

    /// Returns `None` when `counts` does not match the label dimensions.
    pub fn from_counts(
        rows: Vec<String>,
        columns: Vec<String>,
        counts: Vec<Vec<u64>>,
    ) -> Option<Self> {
        if counts.len() != rows.len() || counts.iter().any(|row| row.len() != columns.len()) {
            return None;
        }
        Some(Self {
            rows,
            columns,
            counts,
        })
    }

    pub fn add(&mut self, row: usize, column: usize, count: u64) {
        if let Some(cell) = self
            .counts
            .get_mut(row)
            .and_then(|values| values.get_mut(column))
        {
            *cell += count;
        }
    }

    pub fn increment(&mut self, row: usize, column: usize) {
        self.add(row, column, 1);
    }

    pub fn get(&self, row: usize, column: usize) -> u64 {
        self.counts
            .get(row)
            .and_then(|values| values.get(column))
            .copied()
            .unwrap_or(0)
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    pub fn row_sums(&self) -> Vec<u64> {
        self.counts.iter().map(|row| row.iter().sum::<u64>()).collect()
    }

    pub fn column_sums(&self) -> Vec<u64> {
        (0..self.columns.len())
            .map(|column| self.counts.iter().map(|row| row[column]).sum::<u64>())
            .collect()
    }

    /// Drops rows and columns whose totals are zero.
    pub fn without_empty_margins(&self) -> Self {
        let row_sums = self.row_sums();
        let column_sums = self.column_sums();
        let kept_rows = (0..self.rows.len())
            .filter(|row| row_sums[*row] > 0)
            .collect::<Vec<usize>>();
        let kept_columns = (0..self.columns.len())
            .filter(|column| column_sums[*column] > 0)
            .collect::<Vec<usize>>();

        Self {
            rows: kept_rows.iter().map(|row| self.rows[*row].clone()).collect(),
            columns: kept_columns
                .iter()
                .map(|column| self.columns[*column].clone())
                .collect(),
            counts: kept_rows
                .iter()
                .map(|row| {
                    kept_columns
                        .iter()
                        .map(|column| self.counts[*row][*column])
                        .collect()
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChiSquareResult {
    pub statistic: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
}

impl ChiSquareResult {
    fn neutral(degrees_of_freedom: usize) -> Self {
        Self {
            statistic: 0.0,
            degrees_of_freedom,
            p_value: 1.0,
        }
    }

    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }

    pub fn significance(&self) -> &'static str {
        significance_label(self.p_value)
    }
}

/// Chi-square statistic plus Cramér's V for one table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Association {
    pub chi_square: ChiSquareResult,
    pub cramers_v: f64,
    pub sample_size: u64,
}

/// Pearson's test of independence. Cells with zero expected count are
/// skipped; df is taken from the table's declared dimensions.
pub fn chi_square_test(table: &ContingencyTable) -> ChiSquareResult {
    let (row_count, column_count) = table.dimensions();
    let degrees_of_freedom = row_count.saturating_sub(1) * column_count.saturating_sub(1);
    let total = table.total();
    if total == 0 {
        return ChiSquareResult::neutral(degrees_of_freedom);
    }

    let row_sums = table.row_sums();
    let column_sums = table.column_sums();
    let n = total as f64;

    let mut statistic = 0.0_f64;
    for (row, row_sum) in row_sums.iter().enumerate() {
        for (column, column_sum) in column_sums.iter().enumerate() {
            let expected = (*row_sum as f64) * (*column_sum as f64) / n;
            if expected > 0.0 {
                let delta = table.get(row, column) as f64 - expected;
                statistic += delta * delta / expected;
            }
        }
    }

    ChiSquareResult {
        statistic,
        degrees_of_freedom,
        p_value: chi_square_survival(statistic, degrees_of_freedom),
    }
}

pub fn cramers_v(table: &ContingencyTable) -> f64 {
    let (row_count, column_count) = table.dimensions();
    let smaller = row_count.min(column_count);
    let total = table.total();
    if smaller <= 1 || total == 0 {
        return 0.0;
    }

    let statistic = chi_square_test(table).statistic;
    (statistic / (total as f64 * (smaller - 1) as f64)).sqrt()
}

/// Tests the table after removing empty rows and columns, so labels that
/// never occur do not inflate the degrees of freedom.
pub fn associate(table: &ContingencyTable) -> Association {
    let trimmed = table.without_empty_margins();
    Association {
        chi_square: chi_square_test(&trimmed),
        cramers_v: cramers_v(&trimmed),
        sample_size: trimmed.total(),
    }
}

pub fn chi_square_goodness_of_fit(observed: &[u64], expected: &[f64]) -> ChiSquareResult {
    let degrees_of_freedom = observed.len().saturating_sub(1);
    let statistic = observed
        .iter()
        .zip(expected.iter())
        .filter(|(_, expected)| **expected > 0.0)
        .map(|(observed, expected)| {
            let delta = *observed as f64 - expected;
            delta * delta / expected
        })
        .sum::<f64>();

    ChiSquareResult {
        statistic,
        degrees_of_freedom,
        p_value: chi_square_survival(statistic, degrees_of_freedom),
    }
}

/// Goodness of fit against equal expected counts in every category.
pub fn chi_square_uniformity(observed: &[u64]) -> ChiSquareResult {
    let degrees_of_freedom = observed.len().saturating_sub(1);
    let total = observed.iter().sum::<u64>();
    if total == 0 || observed.is_empty() {
        return ChiSquareResult::neutral(degrees_of_freedom);
    }

    let expected = vec![total as f64 / observed.len() as f64; observed.len()];
    chi_square_goodness_of_fit(observed, &expected)
}

/// Upper-tail probability P(X >= statistic) for X ~ chi-square(df).
pub fn chi_square_survival(statistic: f64, degrees_of_freedom: usize) -> f64 {
    if degrees_of_freedom == 0 || !statistic.is_finite() || statistic <= 0.0 {
        return if statistic.is_infinite() && degrees_of_freedom > 0 {
            0.0
        } else {
            1.0
        };
    }
    regularized_gamma_q(degrees_of_freedom as f64 / 2.0, statistic / 2.0)
}

/// Q(a, x) = Γ(a, x) / Γ(a) for a > 0, x >= 0.
pub fn regularized_gamma_q(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    let q = if x < a + 1.0 {
        1.0 - gamma_p_series(a, x)
    } else {
        gamma_q_continued_fraction(a, x)
    };
    q.clamp(0.0, 1.0)
}

fn gamma_prefactor(a: f64, x: f64) -> f64 {
    (a * x.ln() - x - ln_gamma(a)).exp()
}

fn gamma_p_series(a: f64, x: f64) -> f64 {
    let mut denominator = a;
    let mut term = 1.0 / a;
    let mut sum = term;
    for _ in 0..GAMMA_MAX_ITERATIONS {
        denominator += 1.0;
        term *= x / denominator;
        sum += term;
        if term.abs() < sum.abs() * GAMMA_EPSILON {
            break;
        }
    }
    sum * gamma_prefactor(a, x)
}

fn gamma_q_continued_fraction(a: f64, x: f64) -> f64 {
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / LENTZ_FLOOR;
    let mut d = 1.0 / b;
    let mut h = d;

    for i in 1..=GAMMA_MAX_ITERATIONS {
        let step = i as f64;
        let an = -step * (step - a);
        b += 2.0;

        d = an * d + b;
        if d.abs() < LENTZ_FLOOR {
            d = LENTZ_FLOOR;
        }
        c = b + an / c;
        if c.abs() < LENTZ_FLOOR {
            c = LENTZ_FLOOR;
        }
        d = 1.0 / d;

        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < GAMMA_EPSILON {
            break;
        }
    }

    gamma_prefactor(a, x) * h
}

/// Natural log of Γ(x), Lanczos approximation (g = 7, n = 9).
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let t = x + LANCZOS_G + 0.5;
    let series = LANCZOS_COEFFICIENTS
        .iter()
        .enumerate()
        .skip(1)
        .fold(LANCZOS_COEFFICIENTS[0], |acc, (i, coefficient)| {
            acc + coefficient / (x + i as f64)
        });

    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + series.ln()
}

/// Landis & Koch bands.
pub fn interpret_kappa(kappa: Option<f64>) -> &'static str {
    match kappa {
        None => "undefined",
        Some(value) if value.is_nan() => "undefined",
        Some(value) if value >= 0.81 => "almost perfect",
        Some(value) if value >= 0.61 => "substantial",
        Some(value) if value >= 0.41 => "moderate",
        Some(value) if value >= 0.21 => "fair",
        Some(value) if value >= 0.01 => "slight",
        Some(_) => "poor",
    }
}

pub fn significance_label(p_value: f64) -> &'static str {
    if p_value < 0.001 {
        "highly significant (p < 0.001)"
    } else if p_value < 0.01 {
        "very significant (p < 0.01)"
    } else if p_value < 0.05 {
        "significant (p < 0.05)"
    } else {
        "not significant (p >= 0.05)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn table(counts: Vec<Vec<u64>>) -> ContingencyTable {
        let rows = (0..counts.len()).map(|i| format!("r{i}")).collect();
        let columns = (0..counts.first().map(Vec::len).unwrap_or(0))
            .map(|i| format!("c{i}"))
            .collect();
        ContingencyTable::from_counts(rows, columns, counts).expect("consistent dimensions")
    }

    #[test]
    fn uniform_counts_are_not_significant() {
        let result = chi_square_uniformity(&[10, 10, 10]);
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.degrees_of_freedom, 2);
        assert_eq!(result.p_value, 1.0);
        assert!(!result.is_significant(0.05));
    }

    #[test]
    fn concentrated_counts_are_highly_significant() {
        let result = chi_square_uniformity(&[30, 0, 0]);
        assert!((result.statistic - 60.0).abs() < 1e-12);
        assert_eq!(result.degrees_of_freedom, 2);
        assert!(result.p_value < 0.001);
        assert!(result.p_value > 0.0);
        assert_eq!(result.significance(), "highly significant (p < 0.001)");
    }

    #[test]
    fn empty_uniformity_input_is_neutral() {
        let result = chi_square_uniformity(&[0, 0, 0]);
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn survival_with_two_degrees_of_freedom_matches_closed_form() {
        for statistic in [0.1, 1.0, 2.5, 5.991, 13.8, 60.0] {
            let expected = (-statistic / 2.0_f64).exp();
            let actual = chi_square_survival(statistic, 2);
            assert!(
                ((actual - expected) / expected).abs() < 1e-9,
                "statistic={statistic} expected={expected} actual={actual}"
            );
        }
    }

    #[test]
    fn survival_matches_critical_values() {
        let critical = [
            (3.841_458_820_694_124, 1),
            (5.991_464_547_107_979, 2),
            (9.487_729_036_781_154, 4),
            (18.307_038_053_275_146, 10),
        ];
        for (statistic, df) in critical {
            let p = chi_square_survival(statistic, df);
            assert!((p - 0.05).abs() < 1e-6, "df={df} p={p}");
        }
        assert!((chi_square_survival(6.634_896_601_021_214, 1) - 0.01).abs() < 1e-6);
    }

    #[test]
    fn survival_edge_cases() {
        assert_eq!(chi_square_survival(0.0, 3), 1.0);
        assert_eq!(chi_square_survival(-1.0, 3), 1.0);
        assert_eq!(chi_square_survival(4.0, 0), 1.0);
        assert_eq!(chi_square_survival(f64::INFINITY, 2), 0.0);
        assert!(chi_square_survival(2000.0, 3) < 1e-300);
    }

    #[test]
    fn ln_gamma_matches_known_values() {
        assert!(ln_gamma(1.0).abs() < 1e-13);
        assert!(ln_gamma(2.0).abs() < 1e-13);
        assert!((ln_gamma(0.5) - 0.572_364_942_924_700_1).abs() < 1e-13);
        assert!((ln_gamma(10.0) - 362_880.0_f64.ln()).abs() < 1e-11);
        assert!((ln_gamma(0.25) - 1.288_022_524_698_077_5).abs() < 1e-12);
    }

    #[test]
    fn independence_test_on_two_by_two() {
        let result = chi_square_test(&table(vec![vec![10, 20], vec![20, 10]]));
        assert!((result.statistic - 20.0 / 3.0).abs() < 1e-12);
        assert_eq!(result.degrees_of_freedom, 1);
        assert!(result.p_value < 0.01 && result.p_value > 0.001);
    }

    #[test]
    fn cramers_v_bounds() {
        let perfect = table(vec![vec![10, 0], vec![0, 10]]);
        assert!((chi_square_test(&perfect).statistic - 20.0).abs() < 1e-12);
        assert!((cramers_v(&perfect) - 1.0).abs() < 1e-12);

        let moderate = table(vec![vec![10, 20], vec![20, 10]]);
        assert!((cramers_v(&moderate) - 1.0 / 3.0).abs() < 1e-12);

        let single_row = table(vec![vec![3, 4, 5]]);
        assert_eq!(cramers_v(&single_row), 0.0);

        let empty = ContingencyTable::square(labels(&["a", "b"]));
        assert_eq!(cramers_v(&empty), 0.0);
        assert_eq!(chi_square_test(&empty).p_value, 1.0);
    }

    #[test]
    fn associate_trims_empty_margins() {
        let mut confusion = ContingencyTable::square(labels(&["E", "C", "N"]));
        confusion.add(0, 0, 8);
        confusion.add(0, 2, 2);
        confusion.add(2, 0, 1);
        confusion.add(2, 2, 9);

        let association = associate(&confusion);
        assert_eq!(association.chi_square.degrees_of_freedom, 1);
        assert_eq!(association.sample_size, 20);
        assert!(association.cramers_v > 0.5);
        assert_eq!(
            confusion.without_empty_margins().rows(),
            labels(&["E", "N"]).as_slice()
        );
    }

    #[test]
    fn from_counts_rejects_ragged_input() {
        let ragged = ContingencyTable::from_counts(
            labels(&["a", "b"]),
            labels(&["x", "y"]),
            vec![vec![1, 2], vec![3]],
        );
        assert!(ragged.is_none());
    }

    #[test]
    fn kappa_and_significance_bands() {
        assert_eq!(interpret_kappa(Some(0.9)), "almost perfect");
        assert_eq!(interpret_kappa(Some(0.81)), "almost perfect");
        assert_eq!(interpret_kappa(Some(0.7)), "substantial");
        assert_eq!(interpret_kappa(Some(0.5)), "moderate");
        assert_eq!(interpret_kappa(Some(0.3)), "fair");
        assert_eq!(interpret_kappa(Some(0.05)), "slight");
        assert_eq!(interpret_kappa(Some(0.0)), "poor");
        assert_eq!(interpret_kappa(Some(-0.4)), "poor");
        assert_eq!(interpret_kappa(None), "undefined");

        assert_eq!(significance_label(0.0005), "highly significant (p < 0.001)");
        assert_eq!(significance_label(0.005), "very significant (p < 0.01)");
        assert_eq!(significance_label(0.03), "significant (p < 0.05)");
        assert_eq!(significance_label(0.5), "not significant (p >= 0.05)");
    }

    proptest! {
        #[test]
        fn p_values_and_cramers_v_stay_in_range(
            counts in prop::collection::vec(prop::collection::vec(0_u64..50, 3), 1..5)
        ) {
            let table = table(counts);
            let result = chi_square_test(&table);
            prop_assert!(result.statistic >= 0.0);
            prop_assert!((0.0..=1.0).contains(&result.p_value));
            let v = cramers_v(&table);
            prop_assert!((0.0..=1.0 + 1e-9).contains(&v));
        }

        #[test]
        fn survival_is_monotone_in_statistic(df in 1_usize..20, x in 0.01_f64..80.0) {
            let lower = chi_square_survival(x, df);
            let upper = chi_square_survival(x + 1.0, df);
            prop_assert!(upper <= lower + 1e-12);
        }
    }
}
