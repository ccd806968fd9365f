//! 对局记录存储
//!
//! 结束的对局以 JSON 记录保存在应用数据目录下。

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use protocol::{GameId, GameRecord, GameResult};

/// 存储管理器
pub struct StorageManager {
    records_dir: PathBuf,
}

impl StorageManager {
    /// 使用默认目录
    pub fn new() -> Result<Self> {
        Self::with_dir(get_records_directory()?)
    }

    /// 使用指定目录
    pub fn with_dir(records_dir: impl Into<PathBuf>) -> Result<Self> {
        let records_dir = records_dir.into();
        if !records_dir.exists() {
            fs::create_dir_all(&records_dir)
                .with_context(|| format!("无法创建存储目录: {:?}", records_dir))?;
        }
        Ok(Self { records_dir })
    }

    /// 保存对局记录，返回文件名
    pub fn save_record(&self, game_id: GameId, record: &GameRecord) -> Result<String> {
        let filename = generate_filename(
            &Utc::now(),
            game_id,
            &record.metadata.player_one,
            &record.metadata.player_two,
        );
        let filepath = self.records_dir.join(&filename);

        let json_content = record.to_json().context("序列化对局记录失败")?;
        fs::write(&filepath, json_content)
            .with_context(|| format!("写入文件失败: {:?}", filepath))?;

        Ok(filename)
    }

    /// 加载对局记录
    pub fn load_record(&self, record_id: &str) -> Result<GameRecord> {
        let filepath = self.records_dir.join(record_id);
        if !filepath.exists() {
            anyhow::bail!("对局记录不存在: {}", record_id);
        }

        let content = fs::read_to_string(&filepath)
            .with_context(|| format!("读取文件失败: {:?}", filepath))?;
        GameRecord::from_json(&content).context("解析对局记录失败")
    }

    /// 列出全部记录，最新的在前
    pub fn list_records(&self) -> Result<Vec<SavedRecordInfo>> {
        let mut records = Vec::new();

        let entries = fs::read_dir(&self.records_dir)
            .with_context(|| format!("读取存储目录失败: {:?}", self.records_dir))?;

        for entry in entries {
            let entry = entry.context("读取目录项失败")?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Some(filename) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };

            // 跳过损坏的文件
            let Ok(record) = self.load_record(filename) else {
                continue;
            };
            let saved_at = entry
                .metadata()
                .and_then(|m| m.modified())
                .map(DateTime::from)
                .unwrap_or_else(|_| Utc::now());

            records.push(SavedRecordInfo {
                record_id: filename.to_string(),
                player_one: record.metadata.player_one,
                player_two: record.metadata.player_two,
                result: record.metadata.result,
                saved_at,
                action_count: record.actions.len(),
            });
        }

        records.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(records)
    }

    /// 删除记录
    pub fn delete_record(&self, record_id: &str) -> Result<()> {
        let filepath = self.records_dir.join(record_id);
        if filepath.exists() {
            fs::remove_file(&filepath)
                .with_context(|| format!("删除文件失败: {:?}", filepath))?;
        }
        Ok(())
    }

    pub fn records_directory(&self) -> &Path {
        &self.records_dir
    }
}

/// 已保存记录的摘要
#[derive(Debug, Clone)]
pub struct SavedRecordInfo {
    /// 文件名
    pub record_id: String,
    pub player_one: String,
    pub player_two: String,
    pub result: Option<GameResult>,
    pub saved_at: DateTime<Utc>,
    pub action_count: usize,
}

/// 跨平台存储目录
fn get_records_directory() -> Result<PathBuf> {
    let app_data_dir = dirs::data_dir().context("无法获取应用数据目录")?;
    Ok(app_data_dir.join("quoridor").join("records"))
}

fn generate_filename(
    timestamp: &DateTime<Utc>,
    game_id: GameId,
    player_one: &str,
    player_two: &str,
) -> String {
    format!(
        "{}_{}_{}vs{}.json",
        timestamp.format("%Y%m%d_%H%M%S"),
        game_id,
        sanitize_filename(player_one),
        sanitize_filename(player_two)
    )
}

/// 清理文件名中的特殊字符
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{Action, GameConfig, GameSnapshot, PlayerId, Position, WinReason};
    use tempfile::TempDir;

    fn create_test_storage() -> (StorageManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageManager::with_dir(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    fn sample_record(player_one: &str) -> GameRecord {
        let initial = GameSnapshot::with_start_column(GameConfig::default(), 4);
        let mut record = GameRecord::new(player_one.to_string(), "乙".to_string(), &initial);
        let action = Action::Move {
            to: Position::new(7, 4),
        };
        let after = initial.apply_action(action, PlayerId::One);
        record.record(PlayerId::One, action, &after);
        record
    }

    #[test]
    fn test_save_and_load_record() {
        let (storage, _temp_dir) = create_test_storage();

        let record_id = storage.save_record(3, &sample_record("甲")).unwrap();
        assert!(record_id.contains("_3_甲vs乙"));
        assert!(record_id.ends_with(".json"));

        let loaded = storage.load_record(&record_id).unwrap();
        assert_eq!(loaded.metadata.player_one, "甲");
        assert_eq!(loaded.actions.len(), 1);
        assert_eq!(
            loaded.replay().unwrap().player(PlayerId::One).position,
            Position::new(7, 4)
        );
    }

    #[test]
    fn test_list_and_delete_records() {
        let (storage, _temp_dir) = create_test_storage();

        for i in 1..=3 {
            let mut record = sample_record(&format!("玩家{}", i));
            record.set_result(GameResult {
                winner: PlayerId::Two,
                reason: WinReason::OpponentLeft,
            });
            storage.save_record(i, &record).unwrap();
        }
        // 损坏的文件被跳过
        fs::write(storage.records_directory().join("broken.json"), "{").unwrap();

        let records = storage.list_records().unwrap();
        assert_eq!(records.len(), 3);
        for pair in records.windows(2) {
            assert!(pair[0].saved_at >= pair[1].saved_at);
        }
        assert!(records.iter().all(|r| r.action_count == 1));
        assert!(records.iter().all(|r| r.result.is_some()));

        storage.delete_record(&records[0].record_id).unwrap();
        assert_eq!(storage.list_records().unwrap().len(), 2);
    }

    #[test]
    fn test_load_missing_record() {
        let (storage, _temp_dir) = create_test_storage();
        assert!(storage.load_record("missing.json").is_err());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("正常名称"), "正常名称");
        assert_eq!(sanitize_filename("包含/特殊\\字符"), "包含_特殊_字符");
        assert_eq!(sanitize_filename("AI:中等?"), "AI_中等_");
    }

    #[test]
    fn test_generate_filename() {
        let timestamp = DateTime::parse_from_rfc3339("2026-01-09T15:30:22Z")
            .unwrap()
            .with_timezone(&Utc);

        let filename = generate_filename(&timestamp, 12, "甲", "乙");
        assert_eq!(filename, "20260109_153022_12_甲vs乙.json");
    }
}
