#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpResponseStatusCode {
    OK200,
    NotFound404,
    InternalServerError500,
}

impl HttpResponseStatusCode {
    pub fn code(self) -> u16 {
        match self {
            HttpResponseStatusCode::OK200 => 200,
            HttpResponseStatusCode::NotFound404 => 404,
            HttpResponseStatusCode::InternalServerError500 => 500,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            HttpResponseStatusCode::OK200 => "OK",
            HttpResponseStatusCode::NotFound404 => "Not Found",
            HttpResponseStatusCode::InternalServerError500 => "Internal Server Error",
        }
    }

    pub fn desc(self) -> &'static str {
        match self {
            HttpResponseStatusCode::OK200 => "The request succeeded.",
            HttpResponseStatusCode::NotFound404 =>
                "The requested page does not exist on this server.",
            HttpResponseStatusCode::InternalServerError500 =>
                "The page could not be put together because of an error on the server.",
        }
    }
}
