const EXAMPLE_QUESTION: &str = "Does the website offer Cash on Delivery (COD)";
const EXAMPLE_ANSWER: &str = "Thanks for your query! Currently, we do not offer Cash on Delivery (COD) on our website. However, we are considering implementing it in the future.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// Conversation log for one chat session.
///
/// Starts with a canned example exchange and only ever grows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    turns: Vec<Turn>,
}

impl Default for ChatSession {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    #[inline]
    pub fn new() -> Self {
        Self {
            turns: vec![
                Turn {
                    role: Role::User,
                    content: EXAMPLE_QUESTION.to_string(),
                },
                Turn {
                    role: Role::Assistant,
                    content: EXAMPLE_ANSWER.to_string(),
                },
            ],
        }
    }

    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[inline]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub(crate) fn push(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(Turn {
            role,
            content: content.into(),
        });
    }
}
