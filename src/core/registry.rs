//! 项目注册表
//!
//! 每个项目一把互斥锁：同一项目同一时刻至多一个移动事务，不同项目互不阻塞。
//! 调用外部 LLM 时不要持有项目锁，先拿到意图再进入 `with_project`。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::catalog::ProjectId;
use crate::core::ProjectSession;

pub type SharedSession = Arc<Mutex<ProjectSession>>;

/// 项目会话注册表
#[derive(Default)]
pub struct ProjectRegistry {
    projects: RwLock<HashMap<ProjectId, SharedSession>>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册（或替换）项目会话
    pub async fn insert(&self, session: ProjectSession) -> SharedSession {
        let project_id = session.project_id().to_string();
        let shared = Arc::new(Mutex::new(session));
        self.projects
            .write()
            .await
            .insert(project_id, shared.clone());
        shared
    }

    pub async fn get(&self, project_id: &str) -> Option<SharedSession> {
        self.projects.read().await.get(project_id).cloned()
    }

    pub async fn remove(&self, project_id: &str) -> Option<SharedSession> {
        self.projects.write().await.remove(project_id)
    }

    pub async fn project_ids(&self) -> Vec<ProjectId> {
        let mut ids: Vec<_> = self.projects.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// 持有项目锁执行闭包；闭包内读到的是一致快照，修改原子生效
    pub async fn with_project<F, R>(&self, project_id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut ProjectSession) -> R,
    {
        let shared = self.get(project_id).await?;
        let mut session = shared.lock().await;
        Some(f(&mut session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogBuilder;
    use crate::schedule::ScheduleState;

    fn session(project: &str) -> ProjectSession {
        let catalog = CatalogBuilder::post_production(project).build().unwrap();
        ProjectSession::new(catalog, ScheduleState::empty(project)).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let registry = ProjectRegistry::new();
        registry.insert(session("b")).await;
        registry.insert(session("a")).await;

        assert_eq!(registry.project_ids().await, vec!["a".to_string(), "b".to_string()]);
        let count = registry
            .with_project("a", |s| s.catalog().len())
            .await;
        assert_eq!(count, Some(9));
        assert!(registry.with_project("missing", |_| ()).await.is_none());
        assert!(registry.remove("b").await.is_some());
        assert!(registry.get("b").await.is_none());
    }
}
