//! Release-cadence ("crunch-overtime") score
//!
//! Release years are fitted against release index with an exponential curve
//! `year = A * r^index`. The fit is reflected into the logarithmic curve
//! `(1/A) * log_r(employees * x)` so that cadence shows up as curve height
//! rather than as horizontal spacing. The area under that curve over a fixed
//! window, relative to the bounding rectangle, lands in `[0.5, 1]`; it is then
//! weighted by how many years pass between releases and rescaled to `[0, 1]`.

use crate::config::CadenceConfig;
use crate::curve::{
    exponential_regression, generate_ascending_inputs, logarithmic_integral, Equation,
};
use crate::error::{Result, ScorerError};
use crate::models::valid_release_years;
use tracing::debug;

/// Scores how strongly a release history suggests crunch
pub trait CadenceScorer: Send + Sync {
    /// Score in `[0, 1]`; higher means faster releases for the studio size
    fn score(&self, release_years: &[i32], employee_count: u32) -> Result<f64>;
}

/// Integral-ratio cadence scorer
#[derive(Debug, Clone)]
pub struct IntegralCadenceScorer {
    window: u32,
    reference_years_per_release: f64,
}

impl IntegralCadenceScorer {
    pub fn new(config: &CadenceConfig) -> Self {
        Self {
            window: config.window,
            reference_years_per_release: config.reference_years_per_release,
        }
    }

    /// Area under the reflected curve over `[1, L + 1]` divided by
    /// `L * value(L + 1)`. Always in `[0.5, 1]` for positive employee counts.
    fn integral_ratio(&self, reflected: &Equation) -> Result<f64> {
        let window = self.window as f64;
        let area = logarithmic_integral(reflected, 1.0, window + 1.0)?;
        let bound = window * reflected.value(window + 1.0);
        if !bound.is_finite() || bound == 0.0 {
            return Err(ScorerError::DivisionByZero(
                "reflected curve is flat over the integration window".to_string(),
            ));
        }
        Ok(area / bound)
    }
}

impl Default for IntegralCadenceScorer {
    fn default() -> Self {
        Self::new(&CadenceConfig::default())
    }
}

impl CadenceScorer for IntegralCadenceScorer {
    fn score(&self, release_years: &[i32], employee_count: u32) -> Result<f64> {
        if self.window == 0 {
            return Err(ScorerError::InvalidArgument(
                "cadence window must be at least 1".to_string(),
            ));
        }
        if !(self.reference_years_per_release > 0.0) {
            return Err(ScorerError::InvalidArgument(format!(
                "reference years per release must be positive, got {}",
                self.reference_years_per_release
            )));
        }
        if employee_count == 0 {
            return Err(ScorerError::InvalidArgument(
                "employee count must be positive".to_string(),
            ));
        }

        let years = valid_release_years(release_years);
        if years.len() < 2 {
            return Err(ScorerError::InsufficientData(format!(
                "cadence needs at least 2 release years, got {}",
                years.len()
            )));
        }

        let x = generate_ascending_inputs(years.len() as i64)?;
        let y: Vec<f64> = years.iter().map(|y| *y as f64).collect();
        let fit = exponential_regression(&x, &y)?;
        let Equation::Exponential { scale, rate } = *fit.equation() else {
            unreachable!("exponential_regression always yields an exponential equation");
        };

        // Every release in the same year
        if rate <= 1.0 {
            return Ok(1.0);
        }

        let reflected = Equation::Logarithmic {
            coefficient: 1.0 / scale,
            base: rate,
            inner: employee_count as f64,
        };
        let ratio = self.integral_ratio(&reflected)?;

        // Slope of the release curve at index 0, i.e. ln(r) / a
        let years_per_release = scale * rate.ln();
        let weighted = ratio.powf(years_per_release / self.reference_years_per_release);
        let score = ((weighted - 0.5) * 2.0).clamp(0.0, 1.0);

        debug!(
            releases = years.len(),
            employee_count,
            scale,
            rate,
            ratio,
            years_per_release,
            score,
            "Computed cadence score"
        );

        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> IntegralCadenceScorer {
        IntegralCadenceScorer::default()
    }

    #[test]
    fn test_scenario_dense_vs_sparse_releases() {
        let dense = scorer()
            .score(&[1999, 2000, 2001, 2002, 2003], 1000)
            .unwrap();
        let sparse = scorer().score(&[1999, 2010], 1000).unwrap();

        assert!((0.0..=1.0).contains(&dense), "dense score {}", dense);
        assert!((0.0..=1.0).contains(&sparse), "sparse score {}", sparse);
        assert!(
            dense - sparse > 0.05,
            "dense {} should exceed sparse {}",
            dense,
            sparse
        );
    }

    #[test]
    fn test_deterministic() {
        let years = [2004, 2007, 2008, 2013, 2018];
        let first = scorer().score(&years, 250).unwrap();
        let second = scorer().score(&years, 250).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_slower_cadence_scores_lower() {
        let pairs: [(&[i32], &[i32], u32); 3] = [
            (&[2000, 2001, 2002, 2003], &[2000, 2002, 2004, 2006], 1000),
            (&[2010, 2011, 2012], &[2010, 2013, 2016], 500),
            (&[1995, 1995, 1996, 1996, 1997], &[1995, 1996, 1997, 1998, 1999], 100),
        ];

        for (fast, slow, employees) in pairs {
            let fast_score = scorer().score(fast, employees).unwrap();
            let slow_score = scorer().score(slow, employees).unwrap();
            assert!(
                fast_score > slow_score,
                "{:?} scored {} but {:?} scored {}",
                fast,
                fast_score,
                slow,
                slow_score
            );
        }
    }

    #[test]
    fn test_score_always_in_unit_interval() {
        let histories: [&[i32]; 6] = [
            &[1990, 2020],
            &[2001, 2001, 2001, 2002],
            &[1985, 1990, 1991, 2003, 2004, 2005, 2019],
            &[2015, 2016],
            &[2000, 2000],
            &[1000, 9999],
        ];
        for years in histories {
            for employees in [1, 10, 100, 5_000, 250_000] {
                let score = scorer().score(years, employees).unwrap();
                assert!(
                    (0.0..=1.0).contains(&score),
                    "{:?} with {} employees scored {}",
                    years,
                    employees,
                    score
                );
            }
        }
    }

    #[test]
    fn test_same_year_releases_score_maximum() {
        assert_eq!(scorer().score(&[2012, 2012, 2012], 100).unwrap(), 1.0);
    }

    #[test]
    fn test_placeholder_years_ignored() {
        let with_placeholders = scorer().score(&[2001, 0, 2002, 99, 2003], 300).unwrap();
        let clean = scorer().score(&[2001, 2002, 2003], 300).unwrap();
        assert_eq!(with_placeholders, clean);
    }

    #[test]
    fn test_insufficient_years() {
        assert!(matches!(
            scorer().score(&[2005], 100),
            Err(ScorerError::InsufficientData(_))
        ));
        assert!(matches!(
            scorer().score(&[2005, 0, 1], 100),
            Err(ScorerError::InsufficientData(_))
        ));
        assert!(matches!(
            scorer().score(&[], 100),
            Err(ScorerError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_zero_employees_rejected() {
        assert!(matches!(
            scorer().score(&[2001, 2002], 0),
            Err(ScorerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unweighted_ratio_bounds() {
        let scorer = scorer();
        for employees in [1.0, 100.0, 1000.0, 1e6] {
            let reflected = Equation::Logarithmic {
                coefficient: 1.0 / 2000.0,
                base: 1.0005,
                inner: employees,
            };
            let ratio = scorer.integral_ratio(&reflected).unwrap();
            assert!((0.5..=1.0).contains(&ratio), "ratio {}", ratio);
        }
    }
}
