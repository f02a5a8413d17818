use std::marker::PhantomData;

/// Draws a scene into whatever target is bound on `ctx`.
pub trait SceneRenderer<C: ?Sized> {
    type Scene: ?Sized;
    type Camera: ?Sized;

    fn render_scene(&mut self, ctx: &mut C, scene: &Self::Scene, camera: &Self::Camera);
}

/// Adapts a closure `FnMut(&mut C, &S, &Cam)` to [`SceneRenderer`].
pub struct SceneFn<F, S: ?Sized, Cam: ?Sized> {
    f: F,
    _marker: PhantomData<fn(&S, &Cam)>,
}

impl<F, S: ?Sized, Cam: ?Sized> SceneFn<F, S, Cam> {
    pub fn new<C: ?Sized>(f: F) -> Self
    where
        F: FnMut(&mut C, &S, &Cam),
    {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<C, F, S, Cam> SceneRenderer<C> for SceneFn<F, S, Cam>
where
    C: ?Sized,
    S: ?Sized,
    Cam: ?Sized,
    F: FnMut(&mut C, &S, &Cam),
{
    type Scene = S;
    type Camera = Cam;

    fn render_scene(&mut self, ctx: &mut C, scene: &S, camera: &Cam) {
        (self.f)(ctx, scene, camera)
    }
}
