//! # 言語ネゴシエーション
//!
//! `Accept-Language` ヘッダーからテンプレート探索に使う言語の候補列を決める。
//!
//! - q 値の降順（同じ q 値はヘッダー内の出現順）
//! - 地域サブタグは落とす（`en-US` → `en`）
//! - `q=0` と `*` は候補にしない
//! - 末尾にデフォルト言語を追加する

/// ヘッダーの 1 要素
struct LanguageRange {
    primary: String,
    quality: f32,
}

/// `Accept-Language` の 1 要素をパースする
///
/// 解釈できない要素は `None`。
fn parse_range(part: &str) -> Option<LanguageRange> {
    let mut pieces = part.split(';');
    let tag = pieces.next()?.trim();
    if tag.is_empty() || tag == "*" {
        return None;
    }

    let mut quality = 1.0_f32;
    for param in pieces {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("q") {
            quality = value.trim().parse().ok()?;
        }
    }
    if quality.is_nan() || quality <= 0.0 {
        return None;
    }

    let primary = tag.split('-').next()?.trim().to_ascii_lowercase();
    if primary.is_empty() {
        return None;
    }

    Some(LanguageRange { primary, quality })
}

/// テンプレート探索に使う言語の候補列を返す
///
/// 重複は最初の出現のみ残す。デフォルト言語は常に末尾（既に含まれていればその位置）に入る。
pub fn candidate_languages(accept_language: Option<&str>, default_language: &str) -> Vec<String> {
    let mut ranges: Vec<LanguageRange> = accept_language
        .unwrap_or_default()
        .split(',')
        .filter_map(parse_range)
        .collect();
    // sort_by は安定ソート
    ranges.sort_by(|a, b| b.quality.total_cmp(&a.quality));

    let mut candidates: Vec<String> = Vec::with_capacity(ranges.len() + 1);
    for range in ranges {
        if !candidates.contains(&range.primary) {
            candidates.push(range.primary);
        }
    }

    let default_language = default_language.to_ascii_lowercase();
    if !candidates.contains(&default_language) {
        candidates.push(default_language);
    }

    candidates
}
