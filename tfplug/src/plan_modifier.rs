use crate::types::{AttributePath, Diagnostic, Dynamic};

#[derive(Debug, Clone)]
pub struct PlanModifyRequest {
    pub state: Dynamic,
    pub plan: Dynamic,
    pub config: Dynamic,
    pub path: AttributePath,
}

#[derive(Debug, Clone)]
pub struct PlanModifyResponse {
    pub plan_value: Dynamic,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Trait for modifying terraform plan behavior
///
/// Plan modifiers run on update plans, after defaults have been applied, and can:
/// - Modify the planned value
/// - Mark an attribute as requiring replacement
/// - Add warnings or errors to the plan
pub trait PlanModifier: Send + Sync {
    fn description(&self) -> String;

    /// Modify the plan for an attribute
    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse;
}

/// Marks an attribute as requiring replacement when it changes
pub struct RequiresReplaceIfChanged;

impl PlanModifier for RequiresReplaceIfChanged {
    fn description(&self) -> String {
        "changing this attribute forces a new resource".to_string()
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let requires_replace = !matches!(
            (&request.state, &request.plan),
            (Dynamic::Null, Dynamic::Null) | (Dynamic::Unknown, _) | (_, Dynamic::Unknown)
        ) && !values_equal(&request.state, &request.plan);

        PlanModifyResponse {
            plan_value: request.plan,
            requires_replace,
            diagnostics: Vec::new(),
        }
    }
}

/// Uses the current state value when the planned value is unknown
///
/// Keeps server-assigned values such as ids stable across updates.
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "value does not change once known".to_string()
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let plan_value = match (&request.plan, &request.state) {
            (Dynamic::Unknown, state) if !state.is_null() => state.clone(),
            _ => request.plan,
        };

        PlanModifyResponse {
            plan_value,
            requires_replace: false,
            diagnostics: Vec::new(),
        }
    }
}

pub struct RequiresReplaceIf<F>
where
    F: Fn(&PlanModifyRequest) -> bool + Send + Sync,
{
    predicate: F,
    description: String,
}

impl<F> RequiresReplaceIf<F>
where
    F: Fn(&PlanModifyRequest) -> bool + Send + Sync,
{
    pub fn new(predicate: F, description: impl Into<String>) -> Self {
        Self {
            predicate,
            description: description.into(),
        }
    }
}

impl<F> PlanModifier for RequiresReplaceIf<F>
where
    F: Fn(&PlanModifyRequest) -> bool + Send + Sync,
{
    fn description(&self) -> String {
        self.description.clone()
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let requires_replace = (self.predicate)(&request);

        PlanModifyResponse {
            plan_value: request.plan,
            requires_replace,
            diagnostics: Vec::new(),
        }
    }
}

/// Compares two Dynamic values, treating lists as ordered
pub fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) => true,
        (Dynamic::Unknown, Dynamic::Unknown) => true,
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|v2| values_equal(v, v2)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn request(state: Dynamic, plan: Dynamic) -> PlanModifyRequest {
        PlanModifyRequest {
            config: plan.clone(),
            state,
            plan,
            path: AttributePath::new("field"),
        }
    }

    #[test]
    fn requires_replace_if_changed_does_not_trigger_on_same_value() {
        let response = RequiresReplaceIfChanged
            .modify_plan(request(Dynamic::from("hello"), Dynamic::from("hello")));

        assert!(!response.requires_replace);
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn requires_replace_if_changed_triggers_on_different_value() {
        let response = RequiresReplaceIfChanged
            .modify_plan(request(Dynamic::from("a@example.com"), Dynamic::from("b@example.com")));

        assert!(response.requires_replace);
    }

    #[test]
    fn requires_replace_if_changed_ignores_null_to_null() {
        let response = RequiresReplaceIfChanged.modify_plan(request(Dynamic::Null, Dynamic::Null));

        assert!(!response.requires_replace);
    }

    #[test]
    fn requires_replace_if_changed_ignores_unknown_values() {
        let response =
            RequiresReplaceIfChanged.modify_plan(request(Dynamic::Unknown, Dynamic::from("value")));
        assert!(!response.requires_replace);

        let response =
            RequiresReplaceIfChanged.modify_plan(request(Dynamic::from("value"), Dynamic::Unknown));
        assert!(!response.requires_replace);
    }

    #[test]
    fn values_equal_handles_collections() {
        let list1 = Dynamic::List(vec![Dynamic::from("a"), Dynamic::Number(1.0)]);
        let list2 = Dynamic::List(vec![Dynamic::from("a"), Dynamic::Number(1.0)]);
        let list3 = Dynamic::List(vec![Dynamic::from("b"), Dynamic::Number(1.0)]);
        assert!(values_equal(&list1, &list2));
        assert!(!values_equal(&list1, &list3));

        let map1 = Dynamic::Map(HashMap::from([("key".to_string(), Dynamic::from("value"))]));
        let map2 = Dynamic::Map(HashMap::from([(
            "key".to_string(),
            Dynamic::from("different"),
        )]));
        assert!(values_equal(&map1, &map1.clone()));
        assert!(!values_equal(&map1, &map2));
    }

    #[test]
    fn use_state_for_unknown_preserves_state_when_unknown() {
        let response =
            UseStateForUnknown.modify_plan(request(Dynamic::from("existing"), Dynamic::Unknown));

        assert_eq!(response.plan_value, Dynamic::from("existing"));
        assert!(!response.requires_replace);
    }

    #[test]
    fn use_state_for_unknown_keeps_unknown_without_state() {
        let response = UseStateForUnknown.modify_plan(request(Dynamic::Null, Dynamic::Unknown));

        assert!(response.plan_value.is_unknown());
    }

    #[test]
    fn use_state_for_unknown_uses_plan_when_known() {
        let response =
            UseStateForUnknown.modify_plan(request(Dynamic::from("old"), Dynamic::from("new")));

        assert_eq!(response.plan_value, Dynamic::from("new"));
    }

    #[test]
    fn requires_replace_if_triggers_on_condition() {
        let modifier = RequiresReplaceIf::new(
            |req| {
                matches!((&req.state, &req.plan),
                    (Dynamic::String(old), Dynamic::String(new)) if !old.is_empty() && new.is_empty()
                )
            },
            "Cannot change to empty string without replacement",
        );

        let response = modifier.modify_plan(request(Dynamic::from("has-value"), Dynamic::from("")));
        assert!(response.requires_replace);

        let response = modifier.modify_plan(request(Dynamic::from(""), Dynamic::from("new")));
        assert!(!response.requires_replace);
    }
}
