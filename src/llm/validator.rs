// 响应校验 - 把模型返回的自由文本转换为校验过的分析结果
//
// 1. 取第一个 '{' 到最后一个 '}'（兼容前后缀文字与代码块）
// 2. 解析为 JSON 对象（可选：失败后用 llm_json 修复）
// 3. 逐字段校验，收集全部问题后一次性返回

use llm_json::{repair_json, RepairOptions};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::*;

/// 响应校验器
#[derive(Debug, Clone, Default)]
pub struct ResponseValidator {
    repair_malformed_json: bool,
}

impl ResponseValidator {
    pub fn new(settings: &ValidationSettings) -> Self {
        Self {
            repair_malformed_json: settings.repair_malformed_json,
        }
    }

    /// 严格模式（解析失败直接报错）
    pub fn strict() -> Self {
        Self::default()
    }

    /// 校验原始响应
    pub fn validate(&self, raw: &str) -> AppResult<AnalysisResult> {
        let candidate = extract_json_candidate(raw)?;
        debug!("提取的 JSON 长度: {}", candidate.len());
        let value = self.parse_candidate(candidate)?;
        validate_schema(&value)
    }

    fn parse_candidate(&self, candidate: &str) -> AppResult<Value> {
        let parse_err = match serde_json::from_str::<Value>(candidate) {
            Ok(value) => return ensure_object(value),
            Err(e) => e,
        };

        if !self.repair_malformed_json {
            return Err(AppError::Parse(parse_err.to_string()));
        }

        warn!("JSON 解析失败: {}, 尝试修复后重试", parse_err);

        // 移除不可见字符后再修复
        let cleaned = candidate
            .chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\r' || *c == '\t')
            .collect::<String>();

        let repaired = repair_json(&cleaned, &RepairOptions::default())
            .map_err(|e| AppError::Parse(format!("{} (修复失败: {})", parse_err, e)))?;
        let value = serde_json::from_str::<Value>(&repaired)
            .map_err(|e| AppError::Parse(format!("修复后的 JSON 仍无法解析: {}", e)))?;
        ensure_object(value)
    }
}

fn ensure_object(value: Value) -> AppResult<Value> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(AppError::Parse("顶层不是 JSON 对象".to_string()))
    }
}

/// 提取 JSON 候选片段（第一个 '{' 到最后一个 '}'，含两端）
pub fn extract_json_candidate(raw: &str) -> AppResult<&str> {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&raw[start..=end]),
        _ => Err(AppError::Extraction(format!(
            "响应中没有 {{...}} 片段（{} 字符）",
            raw.chars().count()
        ))),
    }
}

/// 逐字段校验，收集所有问题
struct SchemaCheck<'a> {
    root: &'a Value,
    issues: Vec<String>,
}

impl<'a> SchemaCheck<'a> {
    fn new(root: &'a Value) -> Self {
        Self {
            root,
            issues: Vec::new(),
        }
    }

    fn get(&self, path: &str) -> Option<&'a Value> {
        let pointer = format!("/{}", path.replace('.', "/"));
        self.root.pointer(&pointer).filter(|v| !v.is_null())
    }

    fn issue(&mut self, path: &str, message: &str) {
        self.issues.push(format!("{}: {}", path, message));
    }

    /// 文本字段，数字会被转换为字符串
    fn text(&mut self, path: &str) -> String {
        match self.get(path) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(_) => {
                self.issue(path, "应为字符串");
                String::new()
            }
            None => {
                self.issue(path, "缺失");
                String::new()
            }
        }
    }

    /// 数值字段，接受数字字符串
    fn number_at(&mut self, path: &str, value: Option<&Value>) -> Option<f64> {
        let parsed = match value {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
            Some(_) => None,
            None => {
                self.issue(path, "缺失");
                return None;
            }
        };

        match parsed {
            Some(v) if v.is_finite() => Some(v),
            _ => {
                self.issue(path, "应为数字");
                None
            }
        }
    }

    fn number_in_range(&mut self, path: &str, min: f64, max: f64) -> Option<f64> {
        let value = self.get(path);
        let number = self.number_at(path, value)?;
        if number < min || number > max {
            self.issue(path, &format!("{} 超出范围 {}~{}", number, min, max));
            return None;
        }
        Some(number)
    }

    /// 整数字段，带小数的值不做四舍五入
    fn integer_in_range(&mut self, path: &str, min: f64, max: f64) -> Option<f64> {
        let number = self.number_in_range(path, min, max)?;
        if number.fract() != 0.0 {
            self.issue(path, &format!("{} 应为整数", number));
            return None;
        }
        Some(number)
    }

    fn time_slots(&mut self, path: &str) -> [f64; 6] {
        let mut slots = [0.0; 6];
        let items = match self.get(path) {
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.issue(path, "应为数组");
                return slots;
            }
            None => {
                self.issue(path, "缺失");
                return slots;
            }
        };

        if items.len() != slots.len() {
            self.issue(path, &format!("长度应为 6，实际为 {}", items.len()));
            return slots;
        }

        for (index, item) in items.iter().enumerate() {
            let item_path = format!("{}[{}]", path, index);
            match self.number_at(&item_path, Some(item)) {
                Some(v) if (0.0..=100.0).contains(&v) => slots[index] = v,
                Some(v) => self.issue(&item_path, &format!("{} 超出范围 0~100", v)),
                None => {}
            }
        }
        slots
    }

    fn choice<T>(&mut self, path: &str, parse: fn(&str) -> Option<T>, allowed: &str) -> Option<T> {
        match self.get(path) {
            Some(Value::String(s)) => {
                let parsed = parse(s);
                if parsed.is_none() {
                    self.issue(path, &format!("\"{}\" 不在 {} 之中", s, allowed));
                }
                parsed
            }
            Some(_) => {
                self.issue(path, "应为字符串");
                None
            }
            None => {
                self.issue(path, "缺失");
                None
            }
        }
    }
}

/// 校验分析结果结构
pub fn validate_schema(value: &Value) -> AppResult<AnalysisResult> {
    let mut check = SchemaCheck::new(value);

    let suitability = check.integer_in_range("suitability", 0.0, 100.0);

    let total = check.text("population.total");
    let main_age = check.text("population.mainAge");
    let male = check.number_in_range("population.genderRatio.male", 0.0, 100.0);
    let female = check.number_in_range("population.genderRatio.female", 0.0, 100.0);
    if let (Some(male), Some(female)) = (male, female) {
        // 允许 ±1 的四舍五入误差
        if ((male + female) - 100.0).abs() > 1.0 {
            check.issue(
                "population.genderRatio",
                &format!("male + female 应为 100，实际为 {}", male + female),
            );
        }
    }
    let time_slots = check.time_slots("population.timeSlots");

    let avg_sales = check.text("market.avgSales");
    let competition = check.choice("market.competition", Competition::parse, "낮음/보통/높음/매우높음");
    let avg_rent = check.text("market.avgRent");
    let nearby_similar = check.integer_in_range("market.nearbySimilar", 0.0, u32::MAX as f64);

    let subway = check.text("traffic.subway");
    let bus = check.text("traffic.bus");
    let accessibility = check.choice("traffic.accessibility", Accessibility::parse, "최상/우수/보통/불량");

    match (
        suitability,
        male,
        female,
        competition,
        nearby_similar,
        accessibility,
    ) {
        (
            Some(suitability),
            Some(male),
            Some(female),
            Some(competition),
            Some(nearby_similar),
            Some(accessibility),
        ) if check.issues.is_empty() => Ok(AnalysisResult {
            name: String::new(),
            suitability: suitability as u8,
            population: PopulationBlock {
                total,
                main_age,
                gender_ratio: GenderRatio { male, female },
                time_slots,
            },
            market: MarketBlock {
                avg_sales,
                competition,
                avg_rent,
                nearby_similar: nearby_similar as u32,
            },
            traffic: TrafficBlock {
                subway,
                bus,
                accessibility,
            },
        }),
        _ => Err(AppError::Schema {
            issues: check.issues,
        }),
    }
}
