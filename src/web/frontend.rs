//! Embedded HTML/CSS/JS frontend for the tankwatch dashboard.
//!
//! The entire page is compiled into the binary as a string constant.
//! No external assets, no build tools, no CDN dependencies.

/// The complete single-page dashboard HTML.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>tankwatch Dashboard</title>
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

.app {
  max-width: 1100px;
  margin: 0 auto;
  padding: 24px;
}

header {
  display: flex;
  align-items: center;
  justify-content: space-between;
  margin-bottom: 24px;
  padding-bottom: 16px;
  border-bottom: 1px solid var(--border);
}

header h1 {
  font-size: 24px;
  font-weight: 600;
}

header h1 .logo {
  color: var(--accent);
  font-family: var(--mono);
  font-weight: 700;
}

header .subtitle { color: var(--text-muted); font-size: 13px; }

.actions { display: flex; gap: 8px; align-items: center; }

button {
  padding: 8px 16px;
  border: 1px solid var(--border);
  border-radius: 6px;
  background: var(--surface);
  color: var(--text);
  font-size: 13px;
  cursor: pointer;
}

button:hover { border-color: var(--accent); }
button.primary { background: var(--accent); border-color: var(--accent); color: #fff; }

.hidden { display: none !important; }

/* Login */
.login {
  max-width: 360px;
  margin: 80px auto;
}

.login input {
  width: 100%;
  padding: 8px 10px;
  margin-bottom: 12px;
  background: var(--bg);
  border: 1px solid var(--border);
  border-radius: 6px;
  color: var(--text);
  font-size: 14px;
}

.login .error { color: var(--red); font-size: 13px; min-height: 20px; }

/* Cards */
.card {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 20px;
  margin-bottom: 16px;
}

.card h2 { font-size: 16px; font-weight: 600; margin-bottom: 16px; }

/* Alert banner */
.alert {
  padding: 14px 20px;
  border-radius: var(--radius);
  margin-bottom: 16px;
  font-weight: 600;
  border: 1px solid;
}

.alert.critical { border-color: var(--red); color: var(--red); background: rgba(248,81,73,0.08); }
.alert.warning { border-color: var(--yellow); color: var(--yellow); background: rgba(210,153,34,0.08); }
.alert.ok { border-color: var(--green); color: var(--green); background: rgba(63,185,80,0.08); }
.alert.error { border-color: var(--border); color: var(--text-muted); }

/* Metrics */
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
.stat-card .value.red { color: var(--red); }
.stat-card .value.cyan { color: var(--cyan); }
.stat-card .value.yellow { color: var(--yellow); }

.stat-card .label {
  font-size: 12px;
  color: var(--text-muted);
  margin-top: 6px;
  text-transform: uppercase;
  letter-spacing: 0.5px;
}

.stat-card .delta { font-size: 12px; font-family: var(--mono); margin-top: 4px; }

/* Gauge + chart */
.main-grid {
  display: grid;
  grid-template-columns: 180px 1fr;
  gap: 16px;
}

.tank {
  position: relative;
  height: 240px;
  width: 100px;
  margin: 0 auto;
  border: 2px solid var(--border);
  border-radius: 10px;
  overflow: hidden;
  background: var(--bg);
}

.tank .fill {
  position: absolute;
  bottom: 0;
  left: 0;
  right: 0;
  background: var(--accent);
  transition: height 0.6s;
}

.tank .fill.critical { background: var(--red); }
.tank .fill.warning { background: var(--yellow); }

.tank .reading {
  position: absolute;
  inset: 0;
  display: flex;
  align-items: center;
  justify-content: center;
  font-family: var(--mono);
  font-size: 20px;
  font-weight: 700;
  text-shadow: 0 1px 3px rgba(0,0,0,0.8);
}

svg text { fill: var(--text-muted); font-size: 10px; font-family: var(--mono); }
svg .grid { stroke: var(--border); stroke-width: 1; }
svg .line { fill: none; stroke: var(--accent); stroke-width: 2; }
svg .area { fill: rgba(88,166,255,0.12); }
svg .dot { fill: var(--accent); }

.warnings { color: var(--yellow); font-size: 12px; margin-top: 8px; }
.footer { color: var(--text-muted); font-size: 12px; text-align: right; }

@media (max-width: 720px) {
  .main-grid { grid-template-columns: 1fr; }
}
</style>
</head>
<body>
<div class="app">
  <header>
    <div>
      <h1><span class="logo">tankwatch</span> Dashboard</h1>
      <div class="subtitle">Water tank level monitor</div>
    </div>
    <div class="actions hidden" id="actions">
      <span class="subtitle" id="user"></span>
      <button id="refresh-btn">Refresh</button>
      <button id="logout-btn">Log out</button>
    </div>
  </header>

  <!-- Login -->
  <div class="login card hidden" id="login">
    <h2>Sign in</h2>
    <form id="login-form">
      <input id="username" placeholder="Username" autocomplete="username" required>
      <input id="password" type="password" placeholder="Password" autocomplete="current-password" required>
      <div class="error" id="login-error"></div>
      <button class="primary" type="submit">Log in</button>
    </form>
  </div>

  <!-- Dashboard -->
  <div class="hidden" id="dashboard">
    <div class="alert error" id="alert">Loading...</div>

    <div class="stats-grid">
      <div class="stat-card">
        <div class="value" id="stat-level">--</div>
        <div class="label">Current Level</div>
      </div>
      <div class="stat-card">
        <div class="value green" id="stat-fill">--</div>
        <div class="label">Time to Fill</div>
      </div>
      <div class="stat-card">
        <div class="value red" id="stat-empty">--</div>
        <div class="label">Time to Empty</div>
      </div>
    </div>

    <div class="main-grid">
      <div class="card">
        <h2>Tank</h2>
        <div class="tank">
          <div class="fill" id="tank-fill" style="height:0%"></div>
          <div class="reading" id="tank-reading">--</div>
        </div>
      </div>
      <div class="card">
        <h2>Recent Readings</h2>
        <svg id="chart" viewBox="0 0 640 220" width="100%" preserveAspectRatio="none"></svg>
        <div class="warnings" id="warnings"></div>
      </div>
    </div>

    <div class="stats-grid">
      <div class="stat-card">
        <div class="value cyan" id="stat-trend">--</div>
        <div class="delta" id="stat-delta"></div>
        <div class="label">Trend</div>
      </div>
      <div class="stat-card">
        <div class="value" id="stat-updated">--</div>
        <div class="label">Last Update</div>
      </div>
      <div class="stat-card">
        <div class="value" id="stat-status">--</div>
        <div class="label">Status</div>
      </div>
    </div>

    <div class="footer" id="footer"></div>
  </div>
</div>

<script>
// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------
let refreshSecs = 300;
let refreshTimer = null;

// ---------------------------------------------------------------------------
// API helpers
// ---------------------------------------------------------------------------
async function api(method, path, body) {
  const opts = { method, headers: {}, credentials: 'same-origin' };
  if (body) {
    opts.headers['Content-Type'] = 'application/json';
    opts.body = JSON.stringify(body);
  }
  const res = await fetch(path, opts);
  return { status: res.status, data: await res.json() };
}

function show(id, visible) {
  document.getElementById(id).classList.toggle('hidden', !visible);
}

function setText(id, val) {
  document.getElementById(id).textContent = val;
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------
async function loadSession() {
  const { data } = await api('GET', '/api/session');
  refreshSecs = data.refresh_secs || refreshSecs;
  if (data.authenticated) {
    enterDashboard(data);
  } else {
    show('login', true);
    show('dashboard', false);
    show('actions', false);
  }
}

function enterDashboard(session) {
  show('login', false);
  show('dashboard', true);
  show('actions', true);
  show('logout-btn', session.auth_enabled);
  setText('user', session.username || '');
  loadDashboard(false);
  clearInterval(refreshTimer);
  refreshTimer = setInterval(() => loadDashboard(false), refreshSecs * 1000);
}

document.getElementById('login-form').addEventListener('submit', async e => {
  e.preventDefault();
  setText('login-error', '');
  const { status, data } = await api('POST', '/api/login', {
    username: document.getElementById('username').value,
    password: document.getElementById('password').value,
  });
  if (status === 200) {
    document.getElementById('password').value = '';
    loadSession();
  } else {
    setText('login-error', data.error || 'Login failed');
  }
});

document.getElementById('logout-btn').addEventListener('click', async () => {
  clearInterval(refreshTimer);
  await api('POST', '/api/logout');
  loadSession();
});

document.getElementById('refresh-btn').addEventListener('click', () => loadDashboard(true));

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------
async function loadDashboard(force) {
  try {
    const { status, data } = await api('GET', '/api/dashboard' + (force ? '?refresh=1' : ''));
    if (status === 401) return loadSession();
    renderDashboard(data);
  } catch (e) {
    renderUnavailable('Failed to reach the server: ' + e.message);
  }
}

function renderUnavailable(message) {
  const alert = document.getElementById('alert');
  alert.className = 'alert error';
  alert.textContent = message;
}

function renderDashboard(d) {
  if (!d.available) {
    renderUnavailable(d.error ? 'Could not load readings: ' + d.error : 'No data available.');
    return;
  }

  const s = d.snapshot;
  const alert = document.getElementById('alert');
  alert.className = 'alert ' + s.alert;
  alert.textContent = s.alert_message;

  setText('stat-level', s.current_level + '%');
  setText('stat-fill', s.timing.fill_text);
  setText('stat-empty', s.timing.empty_text);
  setText('stat-trend', s.trend_label);
  setText('stat-delta', s.trend_delta || '');
  setText('stat-updated', s.update_text);
  const status = document.getElementById('stat-status');
  status.textContent = s.alert.charAt(0).toUpperCase() + s.alert.slice(1);
  status.className = 'value ' + ({ critical: 'red', warning: 'yellow', ok: 'green' })[s.alert];

  const level = Math.max(0, Math.min(100, s.current_level));
  const fill = document.getElementById('tank-fill');
  fill.style.height = level + '%';
  fill.className = 'fill' + (s.alert === 'ok' ? '' : ' ' + s.alert);
  setText('tank-reading', s.current_level + '%');

  renderChart(s.history);
  setText('warnings', s.warnings.join(' · '));
  setText('footer', s.reading_count + ' readings · last at ' + formatTime(s.last_update));
}

// ---------------------------------------------------------------------------
// History chart
// ---------------------------------------------------------------------------
function renderChart(history) {
  const W = 640, H = 220, left = 36, right = 12, top = 10, bottom = 30;
  const plotW = W - left - right, plotH = H - top - bottom;
  const x = i => left + (history.length < 2 ? plotW / 2 : (i * plotW) / (history.length - 1));
  const y = v => top + plotH - (Math.max(0, Math.min(100, v)) / 100) * plotH;

  let svg = '';
  for (const tick of [0, 25, 50, 75, 100]) {
    svg += `<line class="grid" x1="${left}" x2="${W - right}" y1="${y(tick)}" y2="${y(tick)}"/>`;
    svg += `<text x="${left - 6}" y="${y(tick) + 3}" text-anchor="end">${tick}</text>`;
  }

  if (history.length > 0) {
    const points = history.map((r, i) => `${x(i)},${y(r.level)}`).join(' ');
    const base = y(0);
    svg += `<polygon class="area" points="${x(0)},${base} ${points} ${x(history.length - 1)},${base}"/>`;
    svg += `<polyline class="line" points="${points}"/>`;
    history.forEach((r, i) => {
      svg += `<circle class="dot" cx="${x(i)}" cy="${y(r.level)}" r="3"><title>${r.level}% at ${formatTime(r.dateTime)}</title></circle>`;
      svg += `<text x="${x(i)}" y="${H - 10}" text-anchor="middle">${formatTime(r.dateTime)}</text>`;
    });
  }

  document.getElementById('chart').innerHTML = svg;
}

// ---------------------------------------------------------------------------
// Utility
// ---------------------------------------------------------------------------
function formatTime(iso) {
  const d = new Date(iso);
  if (isNaN(d)) return '';
  const pad = n => String(n).padStart(2, '0');
  return `${pad(d.getDate())}/${pad(d.getMonth() + 1)} ${pad(d.getHours())}:${pad(d.getMinutes())}`;
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------
loadSession();
</script>
</body>
</html>"##;
