use std::collections::HashMap;
use tracing::{debug, warn};

use crate::remote::AnalysisBackend;

pub const FALLBACK_STATUS: &str = "AI 추천안을 불러오는 데 실패했습니다.";
pub const FALLBACK_ERROR: &str = "AI 추천안 로딩 중 오류가 발생했습니다.";
pub const FALLBACK_EMPTY: &str = "AI 추천안을 생성할 수 없습니다.";

/// Asks the service for one HR suggestion. Never fails: errors become fallback text.
pub async fn suggestion_for<B>(backend: &B, text: &str) -> String
where
    B: AnalysisBackend + ?Sized,
{
    match backend.generate_suggestion(text).await {
        Ok(s) if s.trim().is_empty() => FALLBACK_EMPTY.to_string(),
        Ok(s) => s.trim().to_string(),
        Err(e) if e.is_status() => {
            warn!("Suggestion request rejected - error={}", e);
            FALLBACK_STATUS.to_string()
        }
        Err(e) => {
            warn!("Suggestion request failed - error={}", e);
            FALLBACK_ERROR.to_string()
        }
    }
}

/// One suggestion per drill-down card, fetched on first open.
#[derive(Debug, Default)]
pub struct SuggestionCache {
    by_card: HashMap<String, String>,
}

impl SuggestionCache {
    pub async fn get_or_fetch<B>(&mut self, backend: &B, card_id: &str, text: &str) -> &str
    where
        B: AnalysisBackend + ?Sized,
    {
        if !self.by_card.contains_key(card_id) {
            let s = suggestion_for(backend, text).await;
            self.by_card.insert(card_id.to_string(), s);
        } else {
            debug!("Suggestion cache hit - card={}", card_id);
        }
        &self.by_card[card_id]
    }

    pub fn clear(&mut self) {
        self.by_card.clear();
    }
}
