use std::fmt::{Display, Formatter};

/// Handle of a registered descriptor.
///
/// Encodes the arena slot and the generation of its occupant, packed into the
/// opaque key the readiness facility hands back with every event. A token
/// outliving its descriptor never resolves to whatever reuses the slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Token {
    index: u32,
    generation: u32,
}

impl Token {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Token { index, generation }
    }

    /// Returns the arena slot index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Returns the generation of the slot occupant this token was issued for.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub(crate) fn key(self) -> usize {
        (self.generation as usize) << 32 | self.index as usize
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn from_key(key: usize) -> Self {
        Token::new(key as u32, (key >> 32) as u32)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}:{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

/// Arena of descriptor states addressed by [`Token`].
///
/// Lookups are O(1) and slot contents never move while occupied. Freed slots
/// are recycled LIFO with a bumped generation.
#[derive(Debug)]
pub struct Directory<T> {
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
    len: usize,
    limit: u32,
}

impl<T> Default for Directory<T> {
    fn default() -> Self {
        Self::with_limit(u32::MAX)
    }
}

impl<T> Directory<T> {
    /// An arena that never grows past `limit` slots.
    #[must_use]
    pub fn with_limit(limit: u32) -> Self {
        Directory {
            entries: Vec::new(),
            free: Vec::new(),
            len: 0,
            limit,
        }
    }

    /// Store `value`, returning the token that now names it.
    ///
    /// Hands `value` back when every slot is occupied.
    pub fn insert(&mut self, value: T) -> Result<Token, T> {
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            debug_assert!(entry.value.is_none(), "free slot {index} is occupied");
            entry.value = Some(value);
            self.len += 1;
            return Ok(Token::new(index, entry.generation));
        }
        let Some(index) = u32::try_from(self.entries.len())
            .ok()
            .filter(|index| *index < self.limit)
        else {
            return Err(value);
        };
        self.entries.push(Entry {
            generation: 0,
            value: Some(value),
        });
        self.len += 1;
        Ok(Token::new(index, 0))
    }

    fn entry(&self, token: Token) -> Option<&Entry<T>> {
        self.entries
            .get(token.index())
            .filter(|entry| entry.generation == token.generation)
    }

    /// The value `token` names, if it is still live.
    #[must_use]
    pub fn get(&self, token: Token) -> Option<&T> {
        self.entry(token).and_then(|entry| entry.value.as_ref())
    }

    /// The value `token` names, if it is still live.
    pub fn get_mut(&mut self, token: Token) -> Option<&mut T> {
        self.entries
            .get_mut(token.index())
            .filter(|entry| entry.generation == token.generation)
            .and_then(|entry| entry.value.as_mut())
    }

    /// Whether `token` names a live value.
    #[must_use]
    pub fn contains(&self, token: Token) -> bool {
        self.get(token).is_some()
    }

    /// Take the value out, retiring `token` for good.
    pub fn remove(&mut self, token: Token) -> Option<T> {
        let entry = self
            .entries
            .get_mut(token.index())
            .filter(|entry| entry.generation == token.generation)?;
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(token.index);
        self.len -= 1;
        Some(value)
    }

    /// Number of live values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Tokens of every live value.
    pub fn tokens(&self) -> impl Iterator<Item = Token> + '_ {
        self.entries.iter().enumerate().filter_map(|(index, entry)| {
            entry.value.as_ref().map(|_| {
                #[allow(clippy::cast_possible_truncation)]
                Token::new(index as u32, entry.generation)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut directory = Directory::default();
        assert!(directory.is_empty());
        let a = directory.insert("a").unwrap();
        let b = directory.insert("b").unwrap();
        assert_eq!(2, directory.len());
        assert_eq!(Some(&"a"), directory.get(a));
        assert_eq!(Some(&"b"), directory.get(b));
        *directory.get_mut(b).unwrap() = "bb";
        assert_eq!(Some("bb"), directory.remove(b));
        assert_eq!(None, directory.remove(b));
        assert_eq!(None, directory.get(b));
        assert_eq!(1, directory.len());
        assert_eq!(vec![a], directory.tokens().collect::<Vec<_>>());
    }

    #[test]
    fn reused_slot_rejects_stale_token() {
        let mut directory = Directory::default();
        let old = directory.insert(1).unwrap();
        assert_eq!(Some(1), directory.remove(old));
        let new = directory.insert(2).unwrap();
        assert_eq!(old.index(), new.index());
        assert_ne!(old.generation(), new.generation());
        assert!(!directory.contains(old));
        assert_eq!(None, directory.get_mut(old));
        assert_eq!(None, directory.remove(old));
        assert_eq!(Some(&2), directory.get(new));
    }

    #[test]
    fn key_round_trip() {
        let token = Token::new(7, 3);
        assert_eq!(token, Token::from_key(token.key()));
        let token = Token::new(u32::MAX - 1, u32::MAX - 1);
        assert_eq!(token, Token::from_key(token.key()));
        assert_ne!(Token::new(1, 0).key(), Token::new(0, 1).key());
    }

    #[test]
    fn distinct_tokens_resolve_to_own_values() {
        let mut directory = Directory::default();
        let tokens: Vec<Token> = (0..64).map(|i| directory.insert(i).unwrap()).collect();
        for (i, token) in tokens.iter().enumerate() {
            assert_eq!(Some(&i), directory.get(Token::from_key(token.key())));
        }
    }

    #[test]
    fn full_directory_hands_value_back() {
        let mut directory = Directory::with_limit(2);
        let a = directory.insert("a").unwrap();
        let b = directory.insert("b").unwrap();
        assert_eq!(Err("c"), directory.insert("c"));
        assert_eq!(2, directory.len());
        assert_eq!(Some("a"), directory.remove(a));
        let c = directory.insert("c").unwrap();
        assert_eq!(a.index(), c.index());
        assert_eq!(Err("d"), directory.insert("d"));
        assert_eq!(Some(&"b"), directory.get(b));
        assert_eq!(Some(&"c"), directory.get(c));
    }
}
