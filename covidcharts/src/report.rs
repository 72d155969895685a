use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::reshape::SelectOptions;

/// The fixed set of reports, each rendered to its own file named after `file_stem`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Report {
    NewCasesAbsolute,
    NewCasesRelative,
    TotalCasesAbsolute,
    TotalCasesRelative,
}

impl Report {
    pub fn file_stem(&self) -> &'static str {
        self.into()
    }

    pub fn new_cases(&self) -> bool {
        matches!(self, Report::NewCasesAbsolute | Report::NewCasesRelative)
    }

    pub fn relative_to_pop(&self) -> bool {
        matches!(self, Report::NewCasesRelative | Report::TotalCasesRelative)
    }

    /// Only absolute new cases span enough orders of magnitude to need a log axis.
    pub fn log_scale(&self) -> bool {
        matches!(self, Report::NewCasesAbsolute)
    }

    /// Totals are never smoothed; new cases use `moving_avg_days`.
    pub fn select_options(&self, moving_avg_days: usize) -> SelectOptions {
        SelectOptions {
            new_cases: self.new_cases(),
            relative_to_pop: self.relative_to_pop(),
            moving_avg_days: if self.new_cases() { moving_avg_days } else { 1 },
        }
    }

    pub fn title(&self) -> String {
        format!(
            "{} {} Cases/deaths",
            if self.relative_to_pop() { "Relative" } else { "Absolute" },
            if self.new_cases() { "new" } else { "total" }
        )
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn file_stems_should_match_report_names() {
        let stems: Vec<&str> = Report::iter().map(|r| r.file_stem()).collect();
        assert_eq!(
            stems,
            vec![
                "new_cases_absolute",
                "new_cases_relative",
                "total_cases_absolute",
                "total_cases_relative"
            ]
        );
        assert_eq!(
            "total_cases_relative".parse::<Report>().unwrap(),
            Report::TotalCasesRelative
        );
    }

    #[test]
    fn report_settings_should_follow_variant() {
        assert_eq!(
            Report::NewCasesAbsolute.select_options(7),
            SelectOptions {
                new_cases: true,
                relative_to_pop: false,
                moving_avg_days: 7
            }
        );
        assert_eq!(
            Report::TotalCasesRelative.select_options(7),
            SelectOptions {
                new_cases: false,
                relative_to_pop: true,
                moving_avg_days: 1
            }
        );
        assert!(Report::NewCasesAbsolute.log_scale());
        assert!(!Report::NewCasesRelative.log_scale());
        assert_eq!(Report::NewCasesRelative.title(), "Relative new Cases/deaths");
        assert_eq!(Report::TotalCasesAbsolute.title(), "Absolute total Cases/deaths");
    }
}
