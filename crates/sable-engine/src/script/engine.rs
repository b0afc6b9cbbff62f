use super::{
    Script, ScriptData, ScriptError, ScriptHost, ScriptId, ScriptValue, ENGINE_MODULE,
};
use crate::arena::Arena;

/// Owns the script host and every script created through it.
///
/// Construction initializes the host; dropping the engine releases every
/// script (including the engine-level one) and then finalizes the host.
pub struct ScriptEngine<H: ScriptHost> {
    scripts: Arena<ScriptId, Script<H>>,
    engine_script: Option<Script<H>>,
    host: H,
}

impl<H: ScriptHost> ScriptEngine<H> {
    /// Initialize `host` and bind the engine-level script.
    pub fn new(mut host: H) -> Result<Self, ScriptError> {
        host.initialize()?;
        let engine_script = match Script::new(&mut host, ENGINE_MODULE, None, ScriptData::Engine) {
            Ok(script) => script,
            Err(err) => {
                host.finalize();
                return Err(err);
            }
        };
        tracing::info!("script engine initialized");
        Ok(Self {
            scripts: Arena::new(),
            engine_script: Some(engine_script),
            host,
        })
    }

    /// Create a script for an actor. See [`Script::new`].
    pub fn add_script(
        &mut self,
        module: &str,
        class: Option<&str>,
        data: ScriptData,
    ) -> Result<ScriptId, ScriptError> {
        let script = Script::new(&mut self.host, module, class, data)?;
        Ok(self.scripts.insert(script))
    }

    /// Bind `key` to method `name` on a script. See [`Script::add_method`].
    pub fn add_method(&mut self, id: ScriptId, key: &str, name: &str) -> Result<(), ScriptError> {
        let script = self.scripts.get_mut(id).ok_or(ScriptError::UnknownScript(id))?;
        script.add_method(&mut self.host, key, name)
    }

    /// Call `key` on one script. Unregistered keys are a no-op.
    pub fn call(&mut self, id: ScriptId, key: &str, args: &[ScriptValue]) -> Result<(), ScriptError> {
        let script = self.scripts.get(id).ok_or(ScriptError::UnknownScript(id))?;
        script.call(&mut self.host, key, args)
    }

    /// Release one script.
    pub fn remove_script(&mut self, id: ScriptId) -> bool {
        self.scripts.remove(id).is_some()
    }

    /// Release every actor script. The engine-level script stays.
    pub fn reset(&mut self) {
        let removed = self.scripts.len();
        self.scripts.clear();
        tracing::debug!(removed, "scripts reset");
    }

    /// Call `init` on every script, in creation order.
    pub fn init(&mut self) -> Result<(), ScriptError> {
        self.call_all("init", &[])
    }

    /// Call `update(dt)` on every script, in creation order.
    pub fn update(&mut self, dt: f64) -> Result<(), ScriptError> {
        self.call_all("update", &[ScriptValue::Float(dt)])
    }

    fn call_all(&mut self, key: &str, args: &[ScriptValue]) -> Result<(), ScriptError> {
        for script in self.scripts.values() {
            script.call(&mut self.host, key, args)?;
        }
        Ok(())
    }

    // -- accessors ----------------------------------------------------------

    pub fn script(&self, id: ScriptId) -> Option<&Script<H>> {
        self.scripts.get(id)
    }

    /// Number of actor scripts.
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// The engine-level script.
    pub fn engine_script(&self) -> Option<&Script<H>> {
        self.engine_script.as_ref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

impl<H: ScriptHost> Drop for ScriptEngine<H> {
    fn drop(&mut self) {
        self.scripts.clear();
        self.engine_script = None;
        self.host.finalize();
    }
}
