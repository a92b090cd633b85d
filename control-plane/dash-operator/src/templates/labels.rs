use std::collections::BTreeMap;

/// Label carrying the owner name on every child and in every selector.
pub const IDENTITY_LABEL: &str = "dash.plural.sh/name";

/// Labels that select the application's pods. Never overlaid with user
/// labels, so selectors stay stable.
pub fn selector_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(IDENTITY_LABEL.to_string(), name.to_string())])
}

/// Identity label overlaid with the user's labels.
///
/// A user label keyed `dash.plural.sh/name` wins over the identity value.
/// Callers must not rely on the identity label surviving such a collision.
pub fn app_labels(
    name: &str,
    extra: Option<&BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    let mut labels = selector_labels(name);
    if let Some(extra) = extra {
        for (k, v) in extra {
            labels.insert(k.clone(), v.clone());
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlays_user_labels() {
        let extra = BTreeMap::from([("team".to_string(), "data".to_string())]);
        let labels = app_labels("demo", Some(&extra));
        assert_eq!(labels.get(IDENTITY_LABEL).map(String::as_str), Some("demo"));
        assert_eq!(labels.get("team").map(String::as_str), Some("data"));
    }

    #[test]
    fn user_label_overwrites_identity_on_collision() {
        let extra = BTreeMap::from([(IDENTITY_LABEL.to_string(), "other".to_string())]);
        let labels = app_labels("demo", Some(&extra));
        assert_eq!(labels.get(IDENTITY_LABEL).map(String::as_str), Some("other"));
        // selectors are never overlaid
        assert_eq!(
            selector_labels("demo").get(IDENTITY_LABEL).map(String::as_str),
            Some("demo")
        );
    }
}
