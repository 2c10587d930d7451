// 分类级联选择器 - 维护 大分类/小分类 的一致性
//
// 不变式：sub 始终属于 main 的小分类列表

use serde::Serialize;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::reference::{self, CATEGORIES};

type Catalog = &'static [(&'static str, &'static [&'static str])];

/// 当前分类选择
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySelection {
    pub main_category: String,
    pub sub_category: String,
}

/// 分类级联选择器
#[derive(Debug, Clone)]
pub struct CategoryCascade {
    catalog: Catalog,
    selection: CategorySelection,
}

impl Default for CategoryCascade {
    fn default() -> Self {
        Self {
            catalog: CATEGORIES,
            selection: CategorySelection {
                main_category: reference::DEFAULT_MAIN_CATEGORY.to_string(),
                sub_category: reference::DEFAULT_SUB_CATEGORY.to_string(),
            },
        }
    }
}

impl CategoryCascade {
    /// 使用自定义目录创建，初始选择为第一个大分类的第一个小分类
    pub fn with_catalog(catalog: Catalog) -> AppResult<Self> {
        let (main, subs) = catalog
            .first()
            .ok_or_else(|| AppError::InvalidSelection("分类目录为空".to_string()))?;
        let sub = subs
            .first()
            .ok_or_else(|| AppError::InvalidSelection(format!("大分类 {} 没有小分类", main)))?;
        Ok(Self {
            catalog,
            selection: CategorySelection {
                main_category: main.to_string(),
                sub_category: sub.to_string(),
            },
        })
    }

    pub fn selection(&self) -> &CategorySelection {
        &self.selection
    }

    pub fn main_categories(&self) -> Vec<&'static str> {
        self.catalog.iter().map(|(main, _)| *main).collect()
    }

    /// 当前大分类下可选的小分类
    pub fn options(&self) -> &'static [&'static str] {
        self.subs_of(&self.selection.main_category).unwrap_or(&[])
    }

    fn subs_of(&self, main: &str) -> Option<&'static [&'static str]> {
        self.catalog
            .iter()
            .find(|(name, _)| *name == main)
            .map(|(_, subs)| *subs)
    }

    /// 切换大分类，小分类重置为新列表的第一项
    pub fn set_main(&mut self, main: &str) -> AppResult<&CategorySelection> {
        let subs = self
            .subs_of(main)
            .ok_or_else(|| AppError::InvalidSelection(format!("未知的大分类: {}", main)))?;
        let first = subs
            .first()
            .ok_or_else(|| AppError::InvalidSelection(format!("大分类 {} 没有小分类", main)))?;

        self.selection = CategorySelection {
            main_category: main.to_string(),
            sub_category: first.to_string(),
        };
        debug!(
            "分类已切换: {} / {}",
            self.selection.main_category, self.selection.sub_category
        );
        Ok(&self.selection)
    }

    /// 直接设置小分类，不属于当前大分类时拒绝
    pub fn set_sub(&mut self, sub: &str) -> AppResult<&CategorySelection> {
        if !self.options().contains(&sub) {
            return Err(AppError::InvalidSelection(format!(
                "{} 不属于 {}",
                sub, self.selection.main_category
            )));
        }
        self.selection.sub_category = sub.to_string();
        Ok(&self.selection)
    }
}
