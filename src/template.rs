//! Default server block for newly created sites

const NEW_SITE_TEMPLATE: &str = r#"upstream {{name}} {
    server 127.0.0.1:8080;
}

server {
    listen 80;
    listen [::]:80;

    server_name {{name}};

    location / {
        proxy_pass http://{{name}};
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
    }
}
"#;

/// Render the default server block for a site
pub fn render_new_site(name: &str) -> String {
    NEW_SITE_TEMPLATE.replace("{{name}}", name)
}
