use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ApiError, RulesGroupsApi};
use crate::rules_group::RuleGroup;

/// In-process rules API with the platform's id and order assignment.
#[derive(Debug, Default)]
pub struct MemoryRulesApi {
    groups: RwLock<BTreeMap<String, RuleGroup>>,
    next_id: AtomicU64,
    get_calls: AtomicUsize,
}

impl MemoryRulesApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls served so far.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.groups.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.groups.read().await.is_empty()
    }

    fn allocate_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("00000000-0000-4000-8000-{:012x}", n)
    }

    /// Fills ids and 1-based positions the way the platform does, and sorts
    /// subgroups and rules by their order.
    fn normalize(&self, group: &mut RuleGroup) {
        for (i, subgroup) in group.rule_subgroups.iter_mut().enumerate() {
            subgroup.id.get_or_insert_with(|| self.allocate_id());
            subgroup.order.get_or_insert(i as u32 + 1);
            for (j, rule) in subgroup.rules.iter_mut().enumerate() {
                rule.id.get_or_insert_with(|| self.allocate_id());
                rule.order.get_or_insert(j as u32 + 1);
            }
            subgroup.rules.sort_by_key(|r| r.order);
        }
        group.rule_subgroups.sort_by_key(|s| s.order);
    }
}

#[async_trait]
impl RulesGroupsApi for MemoryRulesApi {
    async fn create(&self, group: &RuleGroup) -> Result<RuleGroup, ApiError> {
        let mut groups = self.groups.write().await;

        let mut created = group.without_ids();
        created.id = Some(self.allocate_id());
        if created.order.is_none() {
            let last = groups.values().filter_map(|g| g.order).max().unwrap_or(0);
            created.order = Some(last + 1);
        }
        self.normalize(&mut created);

        let id = created.id.clone().unwrap_or_default();
        groups.insert(id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: &str) -> Result<RuleGroup, ApiError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.groups
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound { id: id.to_string() })
    }

    async fn update(&self, id: &str, group: &RuleGroup) -> Result<RuleGroup, ApiError> {
        let mut groups = self.groups.write().await;
        let existing_order = groups
            .get(id)
            .ok_or_else(|| ApiError::NotFound { id: id.to_string() })?
            .order;

        let mut updated = group.clone();
        updated.id = Some(id.to_string());
        if updated.order.is_none() {
            updated.order = existing_order;
        }
        self.normalize(&mut updated);

        groups.insert(id.to_string(), updated.clone());
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.groups
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound { id: id.to_string() })
    }

    async fn list(&self) -> Result<Vec<RuleGroup>, ApiError> {
        let mut groups: Vec<RuleGroup> = self.groups.read().await.values().cloned().collect();
        groups.sort_by_key(|g| g.order);
        Ok(groups)
    }
}
