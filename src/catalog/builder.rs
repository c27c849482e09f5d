//! 目录构建器
//!
//! 提供流畅的 API 来构建里程碑类型目录

use crate::catalog::graph::{normalize_code, MilestoneCatalog};
use crate::catalog::types::*;

/// 目录构建器
pub struct CatalogBuilder {
    project_id: ProjectId,
    types: Vec<MilestoneType>,
}

impl CatalogBuilder {
    pub fn new(project_id: impl Into<ProjectId>) -> Self {
        Self {
            project_id: project_id.into(),
            types: Vec::new(),
        }
    }

    /// 添加类型，sort_order 按添加顺序递增
    pub fn milestone_type(mut self, code: impl Into<TypeCode>, name: impl Into<String>) -> Self {
        let order = self.types.len() as i32 + 1;
        self.types
            .push(MilestoneType::new(self.project_id.clone(), code, name, order));
        self
    }

    /// 设置前置类型（覆盖之前的设置）
    pub fn requires<I, S>(mut self, code: &str, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TypeCode>,
    {
        let code = normalize_code(code);
        if let Some(t) = self.types.iter_mut().find(|t| t.code == code) {
            t.requires_completion_of = prerequisites
                .into_iter()
                .map(|c| normalize_code(&c.into()))
                .collect();
        }
        self
    }

    /// 标记为硬性截止
    pub fn hard_deadline(mut self, code: &str) -> Self {
        let code = normalize_code(code);
        if let Some(t) = self.types.iter_mut().find(|t| t.code == code) {
            t.is_hard_deadline = true;
        }
        self
    }

    /// 常见后期流程模板：粗剪 → 剪辑版 → 导演版 → 制片版 → 锁定 → 特效/混音/调色 → 交付
    pub fn post_production(project_id: impl Into<ProjectId>) -> Self {
        Self::new(project_id)
            .milestone_type("ASSEMBLY", "Assembly")
            .milestone_type("EC", "Editor's Cut")
            .milestone_type("DC", "Director's Cut")
            .milestone_type("PC", "Producer's Cut")
            .milestone_type("LOCK", "Picture Lock")
            .milestone_type("VFX", "VFX Turnover")
            .milestone_type("MIX", "Final Mix")
            .milestone_type("COLOR", "Color Grade")
            .milestone_type("DELIVERY", "Delivery")
            .requires("EC", ["ASSEMBLY"])
            .requires("DC", ["EC"])
            .requires("PC", ["DC"])
            .requires("LOCK", ["PC"])
            .requires("VFX", ["LOCK"])
            .requires("MIX", ["LOCK"])
            .requires("COLOR", ["LOCK"])
            .requires("DELIVERY", ["MIX", "COLOR", "VFX"])
            .hard_deadline("DELIVERY")
    }

    pub fn build(self) -> Result<MilestoneCatalog, CatalogError> {
        MilestoneCatalog::new(self.project_id, self.types)
    }
}
