use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug)]
pub(crate) struct CreatedThread {
    pub id: String,
}

#[derive(Serialize, Debug)]
pub(crate) struct NewMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Serialize, Debug)]
pub(crate) struct NewRun<'a> {
    pub assistant_id: &'a str,
}

/// Envelope of list endpoints.
#[derive(Deserialize, Debug)]
pub(crate) struct ListPage<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}
