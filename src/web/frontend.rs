//! Embedded HTML/CSS/JS frontend for the melanalytics dashboard.
//!
//! The entire SPA is compiled into the binary as a string constant.
//! Charts are drawn as inline SVG; no external assets or CDN.

/// The complete single-page dashboard HTML.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Melanoma Detection Analytics</title>
<style>
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --green: #3fb950;
  --yellow: #d29922;
  --red: #f85149;
  --purple: #bc8cff;
  --cyan: #39d2c0;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
  --mono: 'SF Mono', 'Cascadia Code', 'Fira Code', monospace;
}

* { margin: 0; padding: 0; box-sizing: border-box; }
body {
  background: var(--bg);
  color: var(--text);
  font-family: var(--font);
  font-size: 14px;
  line-height: 1.5;
}

.app { max-width: 1200px; margin: 0 auto; padding: 24px; }
.hidden { display: none !important; }

header {
  display: flex;
  align-items: center;
  justify-content: space-between;
  margin-bottom: 24px;
  padding-bottom: 16px;
  border-bottom: 1px solid var(--border);
}
header h1 { font-size: 22px; font-weight: 600; }
header .subtitle { color: var(--text-muted); font-size: 13px; }
.user { display: flex; gap: 12px; align-items: center; color: var(--text-muted); }

button {
  padding: 8px 16px;
  border: 1px solid var(--border);
  border-radius: 6px;
  background: var(--surface);
  color: var(--text);
  font-size: 13px;
  cursor: pointer;
}
button.primary { background: var(--accent); border-color: var(--accent); color: #fff; }
button:hover { filter: brightness(1.15); }

input {
  padding: 8px 10px;
  border: 1px solid var(--border);
  border-radius: 6px;
  background: var(--bg);
  color: var(--text);
  font-size: 13px;
}

.card {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 20px;
  margin-bottom: 16px;
}
.card h2 { font-size: 16px; font-weight: 600; margin-bottom: 16px; }

.login { max-width: 360px; margin: 80px auto; }
.login label { display: block; margin: 12px 0 4px; color: var(--text-muted); font-size: 12px; }
.login input { width: 100%; }
.login button { width: 100%; margin-top: 20px; }

.filters { display: flex; gap: 12px; align-items: flex-end; flex-wrap: wrap; }
.filters label { display: block; color: var(--text-muted); font-size: 12px; margin-bottom: 4px; }
.filters .info { color: var(--text-muted); font-size: 12px; margin-left: auto; }

.banner {
  border-radius: var(--radius);
  padding: 12px 16px;
  margin-bottom: 16px;
  white-space: pre-line;
}
.banner.err { border: 1px solid var(--red); color: var(--red); background: rgba(248,81,73,0.08); }
.banner.ok { border: 1px solid var(--green); color: var(--green); background: rgba(63,185,80,0.08); }

.stats-grid {
  display: grid;
  grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
  gap: 16px;
  margin-bottom: 16px;
}
.stat-card {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 20px;
  text-align: center;
}
.stat-card .value {
  font-size: 32px;
  font-weight: 700;
  font-family: var(--mono);
  color: var(--accent);
  line-height: 1.1;
}
.stat-card .value.green { color: var(--green); }
.stat-card .value.purple { color: var(--purple); }
.stat-card .value.cyan { color: var(--cyan); }
.stat-card .label {
  font-size: 12px;
  color: var(--text-muted);
  margin-top: 6px;
  text-transform: uppercase;
  letter-spacing: 0.5px;
}

.charts { display: grid; grid-template-columns: 1fr 1fr; gap: 16px; }
@media (max-width: 800px) { .charts { grid-template-columns: 1fr; } }

.legend { display: flex; flex-wrap: wrap; gap: 12px; margin-top: 12px; font-size: 12px; }
.legend span::before {
  content: '';
  display: inline-block;
  width: 10px;
  height: 10px;
  border-radius: 2px;
  margin-right: 6px;
  background: var(--c);
}
.empty { color: var(--text-muted); padding: 24px 0; text-align: center; }
svg text { fill: var(--text-muted); font-size: 11px; font-family: var(--font); }
</style>
</head>
<body>
<div class="app">
  <header>
    <div>
      <h1>Melanoma Detection Analytics</h1>
      <div class="subtitle">Usage and risk overview</div>
    </div>
    <div class="user hidden" id="user-box">
      <span id="user-name"></span>
      <button id="logout-btn">Logout</button>
    </div>
  </header>

  <div id="flash"></div>

  <div class="card login hidden" id="login-view">
    <h2>Admin Login</h2>
    <form id="login-form">
      <label for="username">Username</label>
      <input id="username" autocomplete="username">
      <label for="password">Password</label>
      <input id="password" type="password" autocomplete="current-password">
      <button class="primary" type="submit">Login</button>
    </form>
  </div>

  <div class="hidden" id="dashboard-view">
    <div class="card">
      <div class="filters">
        <div><label for="start-date">Start date</label><input type="date" id="start-date"></div>
        <div><label for="end-date">End date</label><input type="date" id="end-date"></div>
        <button class="primary" id="apply-btn">Apply</button>
        <div class="info" id="range-info"></div>
      </div>
    </div>

    <div id="errors"></div>

    <div class="stats-grid">
      <div class="stat-card"><div class="value" id="kpi-users">-</div><div class="label">Total Users</div></div>
      <div class="stat-card"><div class="value green" id="kpi-images">-</div><div class="label">Total Images</div></div>
      <div class="stat-card"><div class="value purple" id="kpi-analyses">-</div><div class="label">Total Analyses</div></div>
      <div class="stat-card"><div class="value cyan" id="kpi-rate">-</div><div class="label">Analysis Rate</div></div>
    </div>

    <div class="charts">
      <div class="card"><h2>Body Part Distribution</h2><div id="body-chart"></div></div>
      <div class="card"><h2>Risk Distribution</h2><div id="risk-chart"></div></div>
    </div>

    <div class="card"><h2>Daily Activity</h2><div id="activity-chart"></div></div>
  </div>
</div>

<script>
// ---------------------------------------------------------------------------
// API helpers
// ---------------------------------------------------------------------------
async function api(method, path, body) {
  const opts = { method, headers: {} };
  if (body) {
    opts.headers['Content-Type'] = 'application/json';
    opts.body = JSON.stringify(body);
  }
  const res = await fetch(path, opts);
  let data = null;
  try { data = await res.json(); } catch (_) {}
  return { status: res.status, data: data || {} };
}

const PALETTE = ['#58a6ff', '#3fb950', '#d29922', '#f85149', '#bc8cff', '#39d2c0', '#ff7b72', '#a5d6ff'];
const NA = 'N/A';

function $(id) { return document.getElementById(id); }

function esc(s) {
  const d = document.createElement('div');
  d.textContent = String(s);
  return d.innerHTML;
}

function fmt(n) {
  return Number(n).toLocaleString();
}

function flash(msg, kind) {
  $('flash').innerHTML = msg ? `<div class="banner ${kind}">${esc(msg)}</div>` : '';
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------
function showLogin(msg) {
  $('login-view').classList.remove('hidden');
  $('dashboard-view').classList.add('hidden');
  $('user-box').classList.add('hidden');
  flash(msg, 'err');
}

function showDashboard(session) {
  $('login-view').classList.add('hidden');
  $('dashboard-view').classList.remove('hidden');
  $('user-box').classList.remove('hidden');
  $('user-name').textContent = session.username || '';
  flash(session.welcome, 'ok');
}

async function checkSession() {
  const { data } = await api('GET', '/api/session');
  if (data.authenticated) {
    showDashboard(data);
    loadDashboard();
  } else {
    showLogin();
  }
}

$('login-form').addEventListener('submit', async (ev) => {
  ev.preventDefault();
  const { status, data } = await api('POST', '/api/login', {
    username: $('username').value,
    password: $('password').value,
  });
  if (status !== 200) {
    showLogin(data.error || 'Login failed');
    return;
  }
  $('password').value = '';
  showDashboard(data);
  loadDashboard();
});

$('logout-btn').addEventListener('click', async () => {
  await api('POST', '/api/logout');
  showLogin();
});

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------
async function loadDashboard() {
  const params = new URLSearchParams();
  if ($('start-date').value) params.set('start_date', $('start-date').value);
  if ($('end-date').value) params.set('end_date', $('end-date').value);
  const qs = params.toString();

  const { status, data } = await api('GET', '/api/dashboard' + (qs ? '?' + qs : ''));
  if (status === 401) {
    showLogin(data.error || 'Please login first');
    return;
  }
  if (status !== 200) {
    $('errors').innerHTML = `<div class="banner err">${esc(data.error || 'Request failed')}</div>`;
    return;
  }
  renderDashboard(data);
  if (data.session_ended) {
    showLogin(data.combined_error);
  }
}

$('apply-btn').addEventListener('click', loadDashboard);

function renderDashboard(d) {
  $('start-date').value = d.range.start;
  $('end-date').value = d.range.end;
  $('start-date').max = d.range.end;
  $('end-date').min = d.range.start;
  $('range-info').textContent = `${d.days_in_range} days`;

  $('errors').innerHTML = d.combined_error
    ? `<div class="banner err">${esc(d.combined_error)}</div>`
    : '';

  const s = d.stats;
  $('kpi-users').textContent = s ? fmt(s.snapshot.total_users) : NA;
  $('kpi-images').textContent = s ? fmt(s.snapshot.total_images) : NA;
  $('kpi-analyses').textContent = s ? fmt(s.snapshot.total_analyses) : NA;
  $('kpi-rate').textContent = s ? s.analysis_rate_display : NA;

  if (s) {
    $('body-chart').innerHTML = s.body_part_shares.length
      ? pieChart(s.body_part_shares)
      : '<div class="empty">No body part distribution data available</div>';
    $('risk-chart').innerHTML = s.risk_shares.length
      ? barChart(s.risk_shares)
      : '<div class="empty">No risk distribution data available</div>';
  } else {
    $('body-chart').innerHTML = `<div class="empty">${NA}</div>`;
    $('risk-chart').innerHTML = `<div class="empty">${NA}</div>`;
  }

  const a = d.activity;
  if (!a) {
    $('activity-chart').innerHTML = `<div class="empty">${NA}</div>`;
  } else if (!a.rows.length) {
    $('activity-chart').innerHTML = '<div class="empty">No activity data available for the selected period</div>';
  } else {
    $('activity-chart').innerHTML = lineChart(a.rows);
  }
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------
function legend(items) {
  return '<div class="legend">' + items.map(([label, color]) =>
    `<span style="--c:${color}">${esc(label)}</span>`).join('') + '</div>';
}

function pieChart(shares) {
  const total = shares.reduce((sum, x) => sum + x.count, 0);
  const r = 90, cx = 100, cy = 100;
  let angle = -Math.PI / 2;
  let paths = '';
  shares.forEach((x, i) => {
    const color = PALETTE[i % PALETTE.length];
    const frac = total > 0 ? x.count / total : 0;
    if (frac >= 0.9999) {
      paths += `<circle cx="${cx}" cy="${cy}" r="${r}" fill="${color}"><title>${esc(x.label)}: ${fmt(x.count)}</title></circle>`;
      return;
    }
    const end = angle + frac * 2 * Math.PI;
    const large = frac > 0.5 ? 1 : 0;
    const x1 = cx + r * Math.cos(angle), y1 = cy + r * Math.sin(angle);
    const x2 = cx + r * Math.cos(end), y2 = cy + r * Math.sin(end);
    paths += `<path d="M${cx},${cy} L${x1},${y1} A${r},${r} 0 ${large} 1 ${x2},${y2} Z" fill="${color}">` +
      `<title>${esc(x.label)}: ${fmt(x.count)} (${x.pct.toFixed(1)}%)</title></path>`;
    angle = end;
  });
  const items = shares.map((x, i) => [`${x.label} (${x.pct.toFixed(1)}%)`, PALETTE[i % PALETTE.length]]);
  return `<svg viewBox="0 0 200 200" width="220" height="220">${paths}</svg>` + legend(items);
}

function barChart(shares) {
  const w = 480, h = 220, pad = 30;
  const max = Math.max(1, ...shares.map(x => x.count));
  const bw = (w - pad * 2) / shares.length;
  let bars = '';
  shares.forEach((x, i) => {
    const bh = (x.count / max) * (h - pad * 2);
    const bx = pad + i * bw + bw * 0.15;
    const by = h - pad - bh;
    bars += `<rect x="${bx}" y="${by}" width="${bw * 0.7}" height="${bh}" rx="3" fill="${PALETTE[i % PALETTE.length]}">` +
      `<title>${esc(x.label)}: ${fmt(x.count)}</title></rect>` +
      `<text x="${bx + bw * 0.35}" y="${by - 4}" text-anchor="middle">${fmt(x.count)}</text>` +
      `<text x="${bx + bw * 0.35}" y="${h - pad + 14}" text-anchor="middle">${esc(x.label)}</text>`;
  });
  return `<svg viewBox="0 0 ${w} ${h}" width="100%">${bars}</svg>`;
}

function lineChart(rows) {
  const w = 960, h = 260, pad = 36;
  const max = Math.max(1, ...rows.map(r => Math.max(r.uploads, r.analyses)));
  const step = rows.length > 1 ? (w - pad * 2) / (rows.length - 1) : 0;
  const px = i => pad + i * step;
  const py = v => h - pad - (v / max) * (h - pad * 2);
  const line = (key, color) =>
    `<polyline fill="none" stroke="${color}" stroke-width="2" points="${rows.map((r, i) => `${px(i)},${py(r[key])}`).join(' ')}"/>` +
    rows.map((r, i) => `<circle cx="${px(i)}" cy="${py(r[key])}" r="3" fill="${color}"><title>${r.date}: ${fmt(r[key])}</title></circle>`).join('');
  const every = Math.max(1, Math.ceil(rows.length / 10));
  const labels = rows.map((r, i) => i % every === 0
    ? `<text x="${px(i)}" y="${h - pad + 16}" text-anchor="middle">${r.date}</text>` : '').join('');
  const axis = `<line x1="${pad}" y1="${h - pad}" x2="${w - pad}" y2="${h - pad}" stroke="#30363d"/>` +
    `<text x="${pad - 6}" y="${pad}" text-anchor="end">${fmt(max)}</text>` +
    `<text x="${pad - 6}" y="${h - pad}" text-anchor="end">0</text>`;
  return `<svg viewBox="0 0 ${w} ${h}" width="100%">${axis}${line('uploads', '#58a6ff')}${line('analyses', '#3fb950')}${labels}</svg>` +
    legend([['Uploads', '#58a6ff'], ['Analyses', '#3fb950']]);
}

checkSession();
</script>
</body>
</html>
"##;
