//! ヘッダーをCGI形式の `HTTP_*` フィールドへ展開する

use http::HeaderMap;

/// 同一キーの値を連結する区切り文字
pub const VALUE_SEPARATOR: char = ';';

/// ヘッダー名を `HTTP_*` キーへ変換する（大文字化し、`-` を `_` に置換）
pub fn http_key(name: &str) -> String {
    let mut key = String::with_capacity(5 + name.len());
    key.push_str("HTTP_");
    key.extend(name.chars().map(|c| match c {
        '-' => '_',
        c => c.to_ascii_uppercase(),
    }));
    key
}

/// 挿入順を保持する `HTTP_*` フィールドのマップ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFields {
    entries: Vec<(String, String)>,
}

impl HeaderFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// キーに対応する値
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 値を設定する。既存の値があれば `;` で連結して追記する
    pub fn append(&mut self, key: String, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, current)) => {
                current.push(VALUE_SEPARATOR);
                current.push_str(value);
            }
            None => self.entries.push((key, value.to_string())),
        }
    }

    /// キーが未設定の場合のみ値を設定する。設定した場合は `true`
    pub fn insert_if_absent(&mut self, key: &str, value: &str) -> bool {
        if self.contains_key(key) {
            return false;
        }
        self.entries.push((key.to_string(), value.to_string()));
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// ヘッダーを出現順に `HTTP_*` フィールドへ展開する
///
/// 同じキーに正規化される値（同名ヘッダーの複数値、`X-Foo` と `X_Foo` など）は
/// 出現順に `;` で連結される。UTF-8でない値は置換文字で表現する。
pub fn project_headers(headers: &HeaderMap, fields: &mut HeaderFields) {
    for (name, value) in headers.iter() {
        let value = String::from_utf8_lossy(value.as_bytes());
        fields.append(http_key(name.as_str()), &value);
    }
}
