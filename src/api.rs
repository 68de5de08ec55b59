pub mod gacha_log; // 祈願履歴APIクライアント（カーソルページング）
pub mod query; // 認証クエリの抽出
