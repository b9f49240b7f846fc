use crate::domain::ChatId;

// ============== Authorization ==============

/// The notification chat is always allowed; anyone else must be listed.
pub fn is_authorized(
    chat_id: ChatId,
    user_id: Option<i64>,
    owner_chat: ChatId,
    allowed_users: &[i64],
) -> bool {
    if chat_id == owner_chat {
        return true;
    }
    let Some(user_id) = user_id else {
        return false;
    };
    allowed_users.contains(&user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_chat_is_always_authorized() {
        assert!(is_authorized(ChatId(-1001), None, ChatId(-1001), &[]));
    }

    #[test]
    fn other_chats_need_an_allowed_user() {
        let owner = ChatId(-1001);
        assert!(is_authorized(ChatId(7), Some(7), owner, &[7, 8]));
        assert!(!is_authorized(ChatId(9), Some(9), owner, &[7, 8]));
        assert!(!is_authorized(ChatId(9), None, owner, &[7, 8]));
        assert!(!is_authorized(ChatId(9), Some(9), owner, &[]));
    }
}
