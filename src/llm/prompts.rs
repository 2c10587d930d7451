// 提示词构建 - 纯函数，无副作用
//
// 分析模式：地区 + 小分类 -> 要求只输出 JSON 的分析提示词
// 对话模式：按关键词与是否已有分析结果选择模板

use crate::models::{AnalysisResult, District};

/// 触发数据分析模板的关键词（区分大小写的子串匹配）
pub const GROUNDED_KEYWORDS: &[&str] = &["분석", "어때", "추천", "analyze", "how is it", "recommend"];

/// 对话模板
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatTemplate {
    /// 基于已有分析结果回答，带简洁性约束
    DataGrounded,
    /// 普通助手
    Generic,
}

/// 构建分析提示词
pub fn build_analysis_prompt(district: &District, category_sub: &str) -> String {
    format!(
        r#"당신은 상권 분석 전문가입니다. [{name}] (좌표: {lat}, {lng}) 지점 반경 200m 이내에서 [{sub}] 업종을 창업할 때의 적합도를 분석하세요.

[제공 데이터]
- 인구: {population}명
- 평균 임대료: {rent}
- 위치: 위도 {lat}, 경도 {lng}

[분석 기준]
1. suitability는 0~100 사이의 정수입니다. 가중치 순서는 1순위 유동인구, 2순위 임대료, 3순위 교통입니다.
2. population.timeSlots는 오전, 점심, 오후, 저녁, 밤, 심야 순서의 유동인구 활성도이며 0~100 사이 숫자 정확히 6개입니다.
3. population.genderRatio의 male과 female의 합은 100입니다.
4. market.competition은 "낮음", "보통", "높음", "매우높음" 중 하나입니다.
5. traffic.accessibility는 "최상", "우수", "보통", "불량" 중 하나입니다.

아래 형식의 JSON 객체 하나만 출력하세요. 설명, 인사말, 마크다운 코드 블록 등 JSON 이외의 텍스트는 절대 포함하지 마세요.
{{
  "suitability": 0,
  "population": {{
    "total": "{population}명",
    "mainAge": "주요 타겟 연령층과 그 이유",
    "genderRatio": {{ "male": 0, "female": 0 }},
    "timeSlots": [0, 0, 0, 0, 0, 0]
  }},
  "market": {{
    "avgSales": "추정 월 평균 매출",
    "competition": "보통",
    "avgRent": "{rent}",
    "nearbySimilar": 0
  }},
  "traffic": {{
    "subway": "인근 지하철 접근성",
    "bus": "버스 접근성",
    "accessibility": "우수"
  }}
}}"#,
        name = district.name,
        lat = district.lat,
        lng = district.lng,
        population = district.population,
        rent = district.rent,
        sub = category_sub,
    )
}

/// 选择对话模板：命中关键词且已有分析结果时使用数据模板
pub fn select_chat_template(message: &str, context: Option<&AnalysisResult>) -> ChatTemplate {
    let wants_analysis = GROUNDED_KEYWORDS
        .iter()
        .any(|keyword| message.contains(keyword));

    match (wants_analysis, context) {
        (true, Some(_)) => ChatTemplate::DataGrounded,
        _ => ChatTemplate::Generic,
    }
}

/// 构建对话提示词
pub fn build_chat_prompt(message: &str, context: Option<&AnalysisResult>) -> String {
    match (select_chat_template(message, context), context) {
        (ChatTemplate::DataGrounded, Some(result)) => {
            // 序列化失败时退化为空对象，不影响对话
            let data = serde_json::to_string(result).unwrap_or_else(|_| "{}".to_string());
            format!(
                r#"당신은 상권 분석 전문가입니다. 아래 분석 데이터를 근거로 답하세요.
사용자가 따로 요청하지 않는 한 다음 조건을 지키세요.
1. 답변은 3~4문장 이내로 요약합니다.
2. 인사나 데이터 확인 같은 서론 없이 결론부터 말합니다.
3. 수치는 가장 중요한 1~2개만 언급합니다.
4. 불릿(•)을 사용하거나 단락을 나눠 읽기 쉽게 씁니다.
데이터: {data}
질문: {message}"#
            )
        }
        _ => format!(
            r#"당신은 친절한 AI 조수입니다. 사용자의 질문에 자연스럽게 답하세요.
질문: {message}"#
        ),
    }
}
