use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use smallvec::SmallVec;

/// Parameters extracted by a [`Matcher`](super::Matcher), in declaration order.
///
/// Wildcards and raw regex groups are keyed by their position (`"0"`, `"1"`, ...),
/// named parameters by their declared name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    buf: SmallVec<[(Arc<str>, Box<str>); 4]>,
}

impl Params {
    pub fn new() -> Self {
        Self {
            buf: SmallVec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.buf
            .iter()
            .find_map(|(k, v)| if &**k == name { Some(&**v) } else { None })
    }

    pub fn parse<T: FromStr>(&self, name: &str) -> Option<Result<T, T::Err>> {
        self.get(name).map(T::from_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.buf.iter().map(|(k, v)| (&**k, &**v))
    }

    /// Keys stay unique: a repeated key keeps its first position and takes the later value.
    pub(crate) fn push(&mut self, key: &Arc<str>, value: &str) {
        match self.buf.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.into(),
            None => self.buf.push((Arc::clone(key), value.into())),
        }
    }
}

impl Deref for Params {
    type Target = [(Arc<str>, Box<str>)];
    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Params {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.push(&Arc::from(k), v);
        }
        params
    }
}
