use uuid::Uuid;

pub const TICKET_NO_LEN: usize = 8;

/// Short, human-presentable ticket number: the first eight hex digits of a
/// random UUID, upper-cased. Uniqueness is enforced by the issued-ticket registry.
pub fn generate() -> String {
    let mut ticket_no = Uuid::new_v4().simple().to_string();
    ticket_no.truncate(TICKET_NO_LEN);
    ticket_no.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_no_shape() {
        let ticket_no = generate();
        assert_eq!(ticket_no.len(), TICKET_NO_LEN);
        assert!(ticket_no
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }
}
