use pathway_algo::{validate_catalog, CatalogIssue};
use serde::Serialize;

use super::EngineResult;
use crate::store::Stores;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogReport {
    pub step_count: usize,
    pub valid: bool,
    /// Some issue can leave a step permanently locked
    pub blocking: bool,
    pub issues: Vec<CatalogIssue>,
}

impl CatalogReport {
    pub fn new(step_count: usize, issues: Vec<CatalogIssue>) -> Self {
        Self {
            step_count,
            valid: issues.is_empty(),
            blocking: issues.iter().any(CatalogIssue::is_blocking),
            issues,
        }
    }
}

#[derive(Clone)]
pub struct CatalogService {
    stores: Stores,
}

impl CatalogService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Checks the active catalog's prerequisite graph.
    pub async fn validate(&self) -> EngineResult<CatalogReport> {
        let steps = self.stores.catalog.list_active_steps().await?;
        let report = CatalogReport::new(steps.len(), validate_catalog(&steps));
        log_catalog_issues(&report.issues);
        Ok(report)
    }
}

pub fn log_catalog_issues(issues: &[CatalogIssue]) {
    for issue in issues {
        if issue.is_blocking() {
            tracing::warn!(?issue, "catalog issue leaves steps unreachable");
        } else {
            tracing::warn!(?issue, "catalog issue");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::StepId;
    use crate::store::Step;

    fn step(id: &str, order: u32, prerequisites: Vec<u32>) -> Step {
        Step {
            id: StepId::parse(id).unwrap(),
            title: String::new(),
            order,
            category_id: "c".to_string(),
            required_score: 80,
            prerequisite_orders: prerequisites,
            active: true,
        }
    }

    #[tokio::test]
    async fn reports_cycles_as_blocking() {
        let (stores, _) = Stores::in_memory();
        for s in [step("a", 1, vec![2]), step("b", 2, vec![1]), step("c", 3, vec![])] {
            stores.curriculum.put_step(&s).await.unwrap();
        }
        let report = CatalogService::new(stores).validate().await.unwrap();
        assert_eq!(report.step_count, 3);
        assert!(!report.valid);
        assert!(report.blocking);
        assert!(report
            .issues
            .iter()
            .any(|i| matches!(i, CatalogIssue::Cycle { .. })));
    }

    #[test]
    fn forward_references_are_not_blocking() {
        let report = CatalogReport::new(2, validate_catalog(&[step("a", 1, vec![2]), step("b", 2, vec![])]));
        assert!(!report.valid);
        assert!(!report.blocking);
    }
}
