//! 仓库分析请求/响应模型
//!
//! 与 `/analyze` 端点的表单请求和 JSON 响应保持一致。

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 分析请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// 仓库标识（原样提交，不做校验）
    #[serde(default)]
    pub repo_name: String,
}

impl AnalysisRequest {
    pub fn new(repo_name: impl Into<String>) -> Self {
        Self {
            repo_name: repo_name.into(),
        }
    }

    /// 编码为 `application/x-www-form-urlencoded` 请求体
    pub fn to_form_body(&self) -> String {
        format!("repo_name={}", urlencoding::encode(&self.repo_name))
    }
}

/// 分析响应
///
/// 除 `error`、`scores`、`suggestions` 之外的字段全部忽略。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<Scores>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<Suggestion>>,
}

impl AnalysisResponse {
    /// 非空的错误信息
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }
}

/// 单个维度得分
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub metric: String,
    pub value: f64,
}

/// 维度得分集合，保持 JSON 对象中的键顺序（即雷达图的轴顺序）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scores(Vec<Score>);

impl Scores {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// 写入得分，同名维度覆盖原值
    pub fn insert(&mut self, metric: impl Into<String>, value: f64) {
        let metric = metric.into();
        match self.0.iter_mut().find(|s| s.metric == metric) {
            Some(existing) => existing.value = value,
            None => self.0.push(Score { metric, value }),
        }
    }

    #[cfg(test)]
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.0.iter().find(|s| s.metric == metric).map(|s| s.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Score> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Scores {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut scores = Scores::new();
        for (metric, value) in iter {
            scores.insert(metric, value);
        }
        scores
    }
}

impl Serialize for Scores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for score in &self.0 {
            map.serialize_entry(&score.metric, &score.value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Scores {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScoresVisitor;

        impl<'de> Visitor<'de> for ScoresVisitor {
            type Value = Scores;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of metric name to number")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Scores, A::Error> {
                let mut scores = Scores::new();
                while let Some((metric, value)) = access.next_entry::<String, f64>()? {
                    scores.insert(metric, value);
                }
                Ok(scores)
            }
        }

        deserializer.deserialize_map(ScoresVisitor)
    }
}

/// 改进建议
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// 原始优先级标签（高 / 中 / 低），展示时原样输出
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub text: String,
}

impl Suggestion {
    #[cfg(test)]
    pub fn new(priority: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            priority: priority.into(),
            text: text.into(),
        }
    }

    /// 解析后的优先级，无法识别时按低优先级处理
    pub fn level(&self) -> Priority {
        Priority::from_label(&self.priority)
    }
}

/// 建议优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn from_label(label: &str) -> Self {
        match label {
            "高" => Priority::High,
            "中" => Priority::Medium,
            _ => Priority::Low,
        }
    }

    /// 展示样式类名
    pub fn css_class(self) -> &'static str {
        match self {
            Priority::High => "priority-high",
            Priority::Medium => "priority-medium",
            Priority::Low => "priority-low",
        }
    }
}
