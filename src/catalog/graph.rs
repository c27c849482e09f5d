//! 里程碑类型依赖图
//!
//! 加载时一次性构建：类型数组（arena，按 sort_order 稳定排序）+ 代码索引 + 前置/后继邻接表。
//! 使用入度表（Kahn）检测环，环即配置错误。

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::catalog::types::*;

/// 项目的里程碑类型目录
#[derive(Debug, Clone)]
pub struct MilestoneCatalog {
    project_id: ProjectId,
    types: Vec<MilestoneType>,
    by_code: HashMap<TypeCode, usize>,
    by_id: HashMap<MilestoneTypeId, usize>,
    /// 下标 -> 前置类型下标（保持 requires_completion_of 的顺序）
    prerequisites: Vec<Vec<usize>>,
    /// 下标 -> 依赖它的类型下标（按 sort_order）
    dependents: Vec<Vec<usize>>,
    topo_order: Vec<usize>,
}

impl MilestoneCatalog {
    /// 构建目录；重复代码、自引用、未知前置、环均直接拒绝
    pub fn new(
        project_id: impl Into<ProjectId>,
        mut types: Vec<MilestoneType>,
    ) -> Result<Self, CatalogError> {
        let project_id = project_id.into();
        types.sort_by_key(|t| t.sort_order);

        let mut by_code = HashMap::new();
        let mut by_id = HashMap::new();
        for (idx, t) in types.iter().enumerate() {
            if t.project_id != project_id {
                return Err(CatalogError::ForeignProject {
                    code: t.code.clone(),
                    expected: project_id,
                    found: t.project_id.clone(),
                });
            }
            if by_code.insert(normalize_code(&t.code), idx).is_some() {
                return Err(CatalogError::DuplicateCode(t.code.clone()));
            }
            by_id.insert(t.id.clone(), idx);
        }

        let mut prerequisites = vec![Vec::new(); types.len()];
        let mut dependents = vec![Vec::new(); types.len()];
        for (idx, t) in types.iter().enumerate() {
            let own = normalize_code(&t.code);
            for code in &t.requires_completion_of {
                let code = normalize_code(code);
                if code == own {
                    return Err(CatalogError::SelfReference(t.code.clone()));
                }
                let Some(&prereq) = by_code.get(&code) else {
                    return Err(CatalogError::UnknownPrerequisite {
                        code: t.code.clone(),
                        missing: code,
                    });
                };
                if !prerequisites[idx].contains(&prereq) {
                    prerequisites[idx].push(prereq);
                    dependents[prereq].push(idx);
                }
            }
        }

        let topo_order = topological_sort(&types, &prerequisites, &dependents)?;

        Ok(Self {
            project_id,
            types,
            by_code,
            by_id,
            prerequisites,
            dependents,
            topo_order,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// 按代码查找（大小写不敏感）
    pub fn get(&self, code: &str) -> Option<&MilestoneType> {
        self.by_code.get(&normalize_code(code)).map(|&i| &self.types[i])
    }

    pub fn get_by_id(&self, id: &str) -> Option<&MilestoneType> {
        self.by_id.get(id).map(|&i| &self.types[i])
    }

    /// 按 sort_order 遍历
    pub fn iter(&self) -> impl Iterator<Item = &MilestoneType> {
        self.types.iter()
    }

    /// 直接前置类型，保持目录声明顺序；未知代码返回空
    pub fn prerequisites_of(&self, code: &str) -> Vec<&MilestoneType> {
        self.neighbours(code, &self.prerequisites)
    }

    /// 直接后继类型（其 requires_completion_of 含该代码）
    pub fn dependents_of(&self, code: &str) -> Vec<&MilestoneType> {
        self.neighbours(code, &self.dependents)
    }

    /// 拓扑序（前置在前，同层按 sort_order）
    pub fn topological_order(&self) -> Vec<&MilestoneType> {
        self.topo_order.iter().map(|&i| &self.types[i]).collect()
    }

    fn neighbours<'a>(&'a self, code: &str, adjacency: &'a [Vec<usize>]) -> Vec<&'a MilestoneType> {
        match self.by_code.get(&normalize_code(code)) {
            Some(&idx) => adjacency[idx].iter().map(|&i| &self.types[i]).collect(),
            None => Vec::new(),
        }
    }
}

pub(crate) fn normalize_code(code: &str) -> TypeCode {
    code.trim().to_uppercase()
}

fn topological_sort(
    types: &[MilestoneType],
    prerequisites: &[Vec<usize>],
    dependents: &[Vec<usize>],
) -> Result<Vec<usize>, CatalogError> {
    let mut in_degree: Vec<usize> = prerequisites.iter().map(Vec::len).collect();
    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(types.len());
    while let Some(Reverse(idx)) = ready.pop() {
        order.push(idx);
        for &dep in &dependents[idx] {
            in_degree[dep] -= 1;
            if in_degree[dep] == 0 {
                ready.push(Reverse(dep));
            }
        }
    }

    if order.len() == types.len() {
        return Ok(order);
    }

    // 剩余节点都至少有一个未处理的前置，沿前置边走必然回到走过的节点
    let remaining: HashSet<usize> = (0..types.len()).filter(|i| in_degree[*i] > 0).collect();
    let Some(&start) = remaining.iter().min() else {
        return Ok(order);
    };
    let mut path = vec![start];
    let mut current = start;
    loop {
        let Some(&next) = prerequisites[current].iter().find(|p| remaining.contains(*p)) else {
            break;
        };
        if let Some(pos) = path.iter().position(|&p| p == next) {
            path.drain(..pos);
            break;
        }
        path.push(next);
        current = next;
    }
    Err(CatalogError::Cycle(
        path.into_iter().map(|i| types[i].code.clone()).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(code: &str, order: i32, requires: &[&str]) -> MilestoneType {
        MilestoneType::new("p1", code, code, order).requires(requires.iter().copied())
    }

    #[test]
    fn test_prerequisites_and_dependents() {
        let catalog = MilestoneCatalog::new(
            "p1",
            vec![
                t("EC", 1, &[]),
                t("DC", 2, &["EC"]),
                t("LOCK", 3, &["DC", "EC"]),
            ],
        )
        .unwrap();

        let prereqs: Vec<_> = catalog.prerequisites_of("lock").into_iter().map(|t| t.code.as_str()).collect();
        assert_eq!(prereqs, vec!["DC", "EC"]);

        let deps: Vec<_> = catalog.dependents_of("EC").into_iter().map(|t| t.code.as_str()).collect();
        assert_eq!(deps, vec!["DC", "LOCK"]);

        assert!(catalog.prerequisites_of("NOPE").is_empty());
    }

    #[test]
    fn test_topological_order_is_stable() {
        let catalog = MilestoneCatalog::new(
            "p1",
            vec![
                t("MIX", 5, &["LOCK"]),
                t("LOCK", 3, &["EC"]),
                t("EC", 1, &[]),
                t("COLOR", 4, &["LOCK"]),
            ],
        )
        .unwrap();
        let order: Vec<_> = catalog.topological_order().into_iter().map(|t| t.code.as_str()).collect();
        assert_eq!(order, vec!["EC", "LOCK", "COLOR", "MIX"]);
    }

    #[test]
    fn test_cycle_rejected() {
        let err = MilestoneCatalog::new(
            "p1",
            vec![
                t("A", 1, &["C"]),
                t("B", 2, &["A"]),
                t("C", 3, &["B"]),
                t("D", 4, &["C"]),
            ],
        )
        .unwrap_err();
        match err {
            CatalogError::Cycle(codes) => {
                assert_eq!(codes.len(), 3);
                assert!(!codes.contains(&"D".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_self_reference_rejected() {
        let err = MilestoneCatalog::new("p1", vec![t("EC", 1, &["EC"])]).unwrap_err();
        assert_eq!(err, CatalogError::SelfReference("EC".into()));
    }

    #[test]
    fn test_unknown_prerequisite_rejected() {
        let err = MilestoneCatalog::new("p1", vec![t("DC", 1, &["EC"])]).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownPrerequisite { .. }));
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let err = MilestoneCatalog::new("p1", vec![t("EC", 1, &[]), t("ec", 2, &[])]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateCode(_)));
    }
}
