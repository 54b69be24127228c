//! Interactive API documentation

use axum::{response::Html, Json};
use serde_json::{json, Value};

const DOCS_HTML: &str = r##"<!DOCTYPE html>
<html>
<head>
  <title>docqa - API docs</title>
  <meta charset="utf-8"/>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    SwaggerUIBundle({ url: "/openapi.json", dom_id: "#swagger-ui" });
  </script>
</body>
</html>
"##;

/// GET /docs - Swagger UI page
pub async fn docs_page() -> Html<&'static str> {
    Html(DOCS_HTML)
}

/// GET /openapi.json - OpenAPI 3 description of the service
pub async fn openapi() -> Json<Value> {
    Json(openapi_document())
}

fn openapi_document() -> Value {
    let error = json!({ "$ref": "#/components/schemas/Error" });

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "docqa",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Answer questions about an uploaded PDF or JSON document with page citations"
        },
        "paths": {
            "/answer": {
                "post": {
                    "summary": "Answer questions about a document",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "multipart/form-data": {
                                "schema": {
                                    "type": "object",
                                    "required": ["document_file", "questions_file"],
                                    "properties": {
                                        "document_file": {
                                            "type": "string",
                                            "format": "binary",
                                            "description": "PDF or JSON document, at most 50MB"
                                        },
                                        "questions_file": {
                                            "type": "string",
                                            "format": "binary",
                                            "description": "JSON array of questions or {\"questions\": [...]}, at most 50 questions"
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "responses": {
                        "200": {
                            "description": "Answers keyed by question, in request order",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "additionalProperties": { "$ref": "#/components/schemas/Answer" }
                                    }
                                }
                            }
                        },
                        "400": { "description": "Invalid upload or questions", "content": { "application/json": { "schema": error } } },
                        "500": { "description": "Internal error", "content": { "application/json": { "schema": error } } },
                        "504": { "description": "Document processing timed out", "content": { "application/json": { "schema": error } } }
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Liveness check",
                    "responses": {
                        "200": {
                            "description": "Service is running",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {
                                            "status": { "type": "string", "example": "active" },
                                            "version": { "type": "string" }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Citation": {
                    "type": "object",
                    "required": ["source", "page"],
                    "properties": {
                        "source": { "type": "string" },
                        "page": { "type": "integer", "nullable": true }
                    }
                },
                "Answer": {
                    "type": "object",
                    "required": ["answer", "citations", "status"],
                    "properties": {
                        "answer": { "type": "string" },
                        "citations": { "type": "array", "items": { "$ref": "#/components/schemas/Citation" } },
                        "status": { "type": "string", "enum": ["found", "partial", "not_found", "error"] }
                    }
                },
                "Error": {
                    "type": "object",
                    "required": ["detail", "type"],
                    "properties": {
                        "detail": { "type": "string" },
                        "type": { "type": "string" }
                    }
                }
            }
        }
    })
}
