use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Which projects a bulk operation applies to.
///
/// On the command line `~` selects only projects created in this run,
/// `*` selects every visible project and anything else is taken as a
/// literal project id. The sentinel strings are parsed exactly once, at
/// the flag boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetSelector {
    NewlyCreated,
    All,
    Specific(String),
}

impl FromStr for TargetSelector {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "~" => TargetSelector::NewlyCreated,
            "*" => TargetSelector::All,
            literal => TargetSelector::Specific(literal.to_string()),
        })
    }
}

impl fmt::Display for TargetSelector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TargetSelector::NewlyCreated => f.write_str("~"),
            TargetSelector::All => f.write_str("*"),
            TargetSelector::Specific(id) => f.write_str(id),
        }
    }
}

impl TargetSelector {
    pub fn resolve(&self, created_this_run: &[String], all_visible: &[String]) -> Vec<String> {
        match self {
            TargetSelector::NewlyCreated => created_this_run.to_vec(),
            TargetSelector::All => all_visible.to_vec(),
            TargetSelector::Specific(id) => vec![id.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projects(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_sentinels() {
        assert_eq!(TargetSelector::NewlyCreated, "~".parse().unwrap());
        assert_eq!(TargetSelector::All, "*".parse().unwrap());
        assert_eq!(
            TargetSelector::Specific("saf-myproj".to_string()),
            "saf-myproj".parse().unwrap()
        );
    }

    #[test]
    fn test_resolution() {
        let created = projects(&["saf-new1", "saf-new2"]);
        let all = projects(&["saf-old", "saf-new1", "saf-new2"]);

        assert_eq!(created, TargetSelector::NewlyCreated.resolve(&created, &all));
        assert_eq!(all, TargetSelector::All.resolve(&created, &all));
        assert_eq!(
            projects(&["other"]),
            TargetSelector::Specific("other".to_string()).resolve(&created, &all)
        );
    }

    #[test]
    fn test_display_round_trip() {
        for raw in ["~", "*", "saf-literal"] {
            let selector: TargetSelector = raw.parse().unwrap();
            assert_eq!(raw, selector.to_string());
        }
    }
}
