//! Input checks run before any request leaves the process.

use unimem_types::platform::{BatchUpdate, MAX_BATCH_SIZE};
use unimem_types::{MemoryError, MemoryResult, Message};

/// `value` must contain something other than whitespace.
pub fn non_empty(field: &str, value: &str) -> MemoryResult<()> {
    if value.trim().is_empty() {
        return Err(MemoryError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Conversation must be non-empty and every message must have role and content.
pub fn messages(messages: &[Message]) -> MemoryResult<()> {
    if messages.is_empty() {
        return Err(MemoryError::validation("messages must not be empty"));
    }
    for (i, msg) in messages.iter().enumerate() {
        non_empty(&format!("messages[{i}].role"), &msg.role)?;
        non_empty(&format!("messages[{i}].content"), &msg.content)?;
    }
    Ok(())
}

fn batch_len(field: &str, len: usize) -> MemoryResult<()> {
    if len == 0 {
        return Err(MemoryError::validation(format!("{field} must not be empty")));
    }
    if len > MAX_BATCH_SIZE {
        return Err(MemoryError::validation(format!(
            "{field} has {len} items, maximum is {MAX_BATCH_SIZE}"
        )));
    }
    Ok(())
}

/// Every id must be non-empty; the whole list is checked before anything is sent.
pub fn ids(field: &str, ids: &[String]) -> MemoryResult<()> {
    batch_len(field, ids.len())?;
    for (i, id) in ids.iter().enumerate() {
        non_empty(&format!("{field}[{i}]"), id)?;
    }
    Ok(())
}

pub fn batch_updates(updates: &[BatchUpdate]) -> MemoryResult<()> {
    batch_len("updates", updates.len())?;
    for (i, update) in updates.iter().enumerate() {
        non_empty(&format!("updates[{i}].memory_id"), &update.memory_id)?;
        non_empty(&format!("updates[{i}].text"), &update.text)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert!(non_empty("id", "abc").is_ok());
        let err = non_empty("id", "   ").unwrap_err();
        assert_eq!(err, MemoryError::validation("id must not be empty"));
    }

    #[test]
    fn test_messages() {
        assert!(messages(&[]).is_err());
        assert!(messages(&[Message::user("hi")]).is_ok());
        let bad = vec![Message::user("hi"), Message::assistant("")];
        let err = messages(&bad).unwrap_err();
        assert!(err.to_string().contains("messages[1].content"));
    }

    #[test]
    fn test_ids_reports_offending_index() {
        let list = vec!["a".to_string(), "".to_string(), "c".to_string()];
        let err = ids("memory_ids", &list).unwrap_err();
        assert!(err.to_string().contains("memory_ids[1]"));
        assert!(ids("memory_ids", &[]).is_err());
    }

    #[test]
    fn test_batch_size_limit() {
        let list: Vec<String> = (0..=MAX_BATCH_SIZE).map(|i| i.to_string()).collect();
        assert!(ids("memory_ids", &list).is_err());
        assert!(ids("memory_ids", &list[..MAX_BATCH_SIZE]).is_ok());
    }

    #[test]
    fn test_batch_updates() {
        assert!(batch_updates(&[BatchUpdate::new("a", "new text")]).is_ok());
        let err = batch_updates(&[BatchUpdate::new("a", "x"), BatchUpdate::new("b", " ")]).unwrap_err();
        assert!(err.to_string().contains("updates[1].text"));
    }
}
