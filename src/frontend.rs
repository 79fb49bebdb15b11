//! Dashboard page served next to the API. The page talks to `/api/*`, which
//! is forwarded to the API server so the browser only ever sees one origin.

use poem::{
    get, handler,
    http::StatusCode,
    web::{Data, Path},
    EndpointExt, IntoResponse, Request, Response, Route,
};
use reqwest::Client as ReqwestClient;

#[derive(Clone)]
pub struct Backend {
    pub client: ReqwestClient,
    pub base_url: String,
}

pub fn create_frontend(backend: Backend) -> impl poem::Endpoint {
    Route::new()
        .at("/", get(index))
        .at("/api/*path", get(proxy).post(proxy))
        .data(backend)
}

#[handler]
async fn proxy(Path(path): Path<String>, req: &Request, backend: Data<&Backend>) -> Response {
    let mut url = format!("{}/{}", backend.base_url.trim_end_matches('/'), path);
    if let Some(query) = req.uri().query() {
        url.push('?');
        url.push_str(query);
    }

    let request = if req.method() == poem::http::Method::POST {
        backend.client.post(&url)
    } else {
        backend.client.get(&url)
    };

    match request.send().await {
        Ok(resp) => {
            let status = StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
            let content_type = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("application/json")
                .to_string();
            let disposition = resp
                .headers()
                .get(reqwest::header::CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            match resp.bytes().await {
                Ok(body) => {
                    let mut builder = Response::builder().status(status).content_type(content_type);
                    if let Some(disposition) = disposition {
                        builder = builder.header(poem::http::header::CONTENT_DISPOSITION, disposition);
                    }
                    builder.body(body.to_vec())
                }
                Err(e) => {
                    tracing::error!("Failed to read backend response: {}", e);
                    Response::builder()
                        .status(StatusCode::BAD_GATEWAY)
                        .body("Failed to read backend response")
                }
            }
        }
        Err(e) => {
            tracing::error!("Failed to contact backend at {}: {}", url, e);
            Response::builder()
                .status(StatusCode::BAD_GATEWAY)
                .body("Failed to contact backend")
        }
    }
}

#[handler]
async fn index() -> impl IntoResponse {
    Response::builder()
        .content_type("text/html")
        .body(INDEX_HTML)
}

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Crypto Price Monitor and Analysis</title>
    <style>
        body { font-family: sans-serif; margin: 0; display: flex; }
        aside { width: 220px; padding: 16px; background: #f3f3f3; min-height: 100vh; }
        main { flex: 1; padding: 16px 32px; }
        .bar-row { display: flex; align-items: center; margin: 2px 0; font-size: 13px; }
        .bar-label { width: 140px; overflow: hidden; white-space: nowrap; }
        .bar { height: 14px; }
        table { border-collapse: collapse; font-size: 12px; }
        td, th { border: 1px solid #ddd; padding: 2px 6px; }
        .error { color: #b00; }
    </style>
</head>
<body>
    <aside>
        <h3>Data Controls</h3>
        <label>Display Top N Coins: <span id="top-label">20</span></label>
        <input type="range" id="top" min="1" max="100" value="20">
        <p>
            <label>Percent change time frame</label>
            <select id="timeframe">
                <option>1h</option><option>24h</option><option>7d</option>
                <option>30d</option><option>60d</option><option>90d</option>
            </select>
        </p>
        <button id="refresh">Refresh data</button>
        <p id="status"></p>
    </aside>
    <main>
        <h1>Crypto Price Monitor and Analysis</h1>
        <p>Market data is retrieved from <a href="https://coinmarketcap.com">CoinMarketCap</a>.</p>
        <section id="insights">
            <h3>Quick insights</h3>
            <h5>Five most traded by volume in the past 24 hours</h5><p id="most-traded"></p>
            <h5>Five highest Year-to-Date (YTD) growth</h5><p id="highest-ytd"></p>
            <h5>Steady positive growth over the past week</h5><p id="steady-growth"></p>
        </section>
        <h3>Percentage Price Change of Cryptocurrencies</h3>
        <div id="change-chart"></div>
        <h3 id="price-title">Current Price of Cryptocurrencies</h3>
        <div id="price-chart"></div>
        <h3>Price Data of Cryptocurrencies</h3>
        <a id="download" href="#">Download data as CSV</a>
        <p id="dimension"></p>
        <div id="table"></div>
    </main>
    <script>
        const $ = (id) => document.getElementById(id);

        async function getJson(path) {
            const res = await fetch('/api/' + path);
            const body = await res.json();
            if (!res.ok) throw new Error(body.error || res.statusText);
            return body;
        }

        function el(tag, text, style) {
            const node = document.createElement(tag);
            if (text !== undefined) node.textContent = text;
            if (style) Object.assign(node.style, style);
            return node;
        }

        function formatValue(v) {
            return typeof v === 'number' && Number.isFinite(v) ? v.toPrecision(4) : 'n/a';
        }

        function bars(target, items, value, color) {
            const numbers = items.map(value).filter(v => typeof v === 'number' && Number.isFinite(v));
            const max = Math.max(...numbers.map(Math.abs), 1e-9);
            target.replaceChildren(...items.map(i => {
                const v = value(i);
                const known = typeof v === 'number' && Number.isFinite(v);
                const row = el('div');
                row.className = 'bar-row';
                const label = el('span', i.name);
                label.className = 'bar-label';
                const bar = el('span', undefined, {
                    width: (known ? Math.max(1, Math.abs(v) / max * 400) : 0) + 'px',
                    background: color(i),
                });
                bar.className = 'bar';
                row.append(label, bar, el('span', '\u00a0' + formatValue(v)));
                return row;
            }));
        }

        function renderTable(target, columns, rows) {
            const grid = el('table');
            const header = el('tr');
            header.append(...columns.map(c => el('th', c)));
            grid.append(header, ...rows.map(r => {
                const tr = el('tr');
                tr.append(...r.map(v => el('td', v === null || v === undefined ? '' : String(v))));
                return tr;
            }));
            target.replaceChildren(grid);
        }

        async function loadInsights() {
            try {
                const insights = await getJson('insights');
                $('most-traded').textContent = insights.display.most_traded;
                $('highest-ytd').textContent = insights.display.highest_ytd;
                $('steady-growth').textContent = insights.display.steady_growth;
            } catch (e) {
                $('insights').style.display = 'none';
            }
        }

        async function load() {
            const top = $('top').value;
            const timeframe = $('timeframe').value;
            $('top-label').textContent = top;
            $('price-title').textContent = 'Current Price of Cryptocurrencies - Top ' + top;
            $('download').href = '/api/coins.csv?top=' + top;
            try {
                const [coins, price, change] = await Promise.all([
                    getJson('coins?top=' + top),
                    getJson('charts/price?top=' + top),
                    getJson('charts/change?top=' + top + '&timeframe=' + timeframe),
                ]);
                bars($('change-chart'), change.bars, b => b.change, b => b.color);
                bars($('price-chart'), price.bars, b => b.price, () => 'steelblue');
                $('dimension').textContent = `Data Dimension: ${coins.dimension.rows} rows and ${coins.dimension.columns} columns.`;
                renderTable($('table'), coins.columns, coins.rows);
                $('status').textContent = 'Fetched ' + coins.fetched_at;
                $('status').className = '';
            } catch (e) {
                $('status').textContent = e.message;
                $('status').className = 'error';
            }
        }

        $('top').addEventListener('input', load);
        $('timeframe').addEventListener('change', load);
        $('refresh').addEventListener('click', async () => {
            try {
                const res = await fetch('/api/refresh', { method: 'POST' });
                if (!res.ok) throw new Error((await res.json()).error);
                await Promise.all([load(), loadInsights()]);
            } catch (e) {
                $('status').textContent = e.message;
                $('status').className = 'error';
            }
        });
        load();
        loadInsights();
    </script>
</body>
</html>"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_page_is_complete() {
        assert!(INDEX_HTML.starts_with("<!DOCTYPE html>"));
        assert!(INDEX_HTML.trim_end().ends_with("</html>"));
        assert!(INDEX_HTML.contains(r##"<a id="download" href="#">"##));
        assert!(INDEX_HTML.contains("loadInsights();"));
    }

    #[test]
    fn test_index_page_renders_text_safely() {
        assert!(!INDEX_HTML.contains("innerHTML"));
        assert!(!INDEX_HTML.contains("value(i).toPrecision"));
        assert!(INDEX_HTML.contains("Number.isFinite(v) ? v.toPrecision(4) : 'n/a'"));
    }
}
